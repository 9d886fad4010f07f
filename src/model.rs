//! Structured node tree for travel-guide articles
//!
//! This is the shape downstream transformers build from an artifact's raw
//! wikitext. Every node serializes as
//! `{"type": ..., "properties": {...}, "children": [...]}`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Template parameters by name
pub type TemplateParams = BTreeMap<String, String>;

/// A node and its ordered children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default)]
    pub children: Vec<Node>,
}

/// Node kind together with its properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "properties", rename_all = "lowercase")]
pub enum NodeKind {
    Root(RootProperties),
    Section(SectionProperties),
    Text(TextProperties),
    Template(TemplateProperties),
    See(ListingProperties),
    Do(ListingProperties),
    Buy(ListingProperties),
    Eat(ListingProperties),
    Drink(ListingProperties),
    Sleep(SleepProperties),
    /// Generic `{{listing}}`
    Listing(ListingProperties),
    Marker(MarkerProperties),
}

/// Page-level metadata collected from document-wide templates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagebanner: Option<TemplateParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapframe: Option<TemplateParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routebox: Option<TemplateParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo: Option<TemplateParams>,
    #[serde(rename = "ispartof", alias = "isPartOf", skip_serializing_if = "Option::is_none")]
    pub is_part_of: Option<TemplateParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usablecity: Option<TemplateParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidecity: Option<TemplateParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outlinecity: Option<TemplateParams>,
}

impl RootProperties {
    /// Templates whose parameters belong to the page rather than a section
    pub const DOCUMENT_TEMPLATES: [&'static str; 8] = [
        "pagebanner",
        "mapframe",
        "routebox",
        "geo",
        "ispartof",
        "usablecity",
        "guidecity",
        "outlinecity",
    ];

    /// Store a document-wide template, replacing an earlier occurrence.
    /// Returns false if `name` is not a document template.
    pub fn set_template(&mut self, name: &str, params: TemplateParams) -> bool {
        let slot = match name.trim().to_lowercase().as_str() {
            "pagebanner" => &mut self.pagebanner,
            "mapframe" => &mut self.mapframe,
            "routebox" => &mut self.routebox,
            "geo" => &mut self.geo,
            "ispartof" => &mut self.is_part_of,
            "usablecity" => &mut self.usablecity,
            "guidecity" => &mut self.guidecity,
            "outlinecity" => &mut self.outlinecity,
            _ => return false,
        };
        *slot = Some(params);
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionProperties {
    pub title: String,
    /// Heading level (`==` is 2)
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextProperties {
    pub markdown: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateProperties {
    pub name: String,
    #[serde(default)]
    pub params: TemplateParams,
}

/// Fields shared by every listing template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tollfree: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fax: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastedit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wikipedia: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wikidata: Option<String>,
    /// Description, converted to markdown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Accommodation listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepProperties {
    #[serde(flatten)]
    pub listing: ListingProperties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout: Option<String>,
}

/// Point on the page map (`{{marker}}`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub marker_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wikidata: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Listing template families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingKind {
    See,
    Do,
    Buy,
    Eat,
    Drink,
    Sleep,
    Listing,
}

impl ListingKind {
    /// Listing kind of a template name, case-insensitive
    pub fn from_template_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "see" => Some(ListingKind::See),
            "do" => Some(ListingKind::Do),
            "buy" => Some(ListingKind::Buy),
            "eat" => Some(ListingKind::Eat),
            "drink" => Some(ListingKind::Drink),
            "sleep" => Some(ListingKind::Sleep),
            "listing" => Some(ListingKind::Listing),
            _ => None,
        }
    }
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }

    pub fn root(title: impl Into<String>) -> Self {
        Self::new(NodeKind::Root(RootProperties {
            title: Some(title.into()),
            ..Default::default()
        }))
    }

    pub fn section(title: impl Into<String>, level: u8) -> Self {
        Self::new(NodeKind::Section(SectionProperties {
            title: title.into(),
            level,
        }))
    }

    pub fn text(markdown: impl Into<String>) -> Self {
        Self::new(NodeKind::Text(TextProperties {
            markdown: markdown.into(),
        }))
    }

    pub fn template(name: impl Into<String>, params: TemplateParams) -> Self {
        Self::new(NodeKind::Template(TemplateProperties {
            name: name.into(),
            params,
        }))
    }

    /// Listing node of `kind`; sleep listings start without check-in times
    pub fn listing(kind: ListingKind, properties: ListingProperties) -> Self {
        Self::new(match kind {
            ListingKind::See => NodeKind::See(properties),
            ListingKind::Do => NodeKind::Do(properties),
            ListingKind::Buy => NodeKind::Buy(properties),
            ListingKind::Eat => NodeKind::Eat(properties),
            ListingKind::Drink => NodeKind::Drink(properties),
            ListingKind::Sleep => NodeKind::Sleep(SleepProperties {
                listing: properties,
                ..Default::default()
            }),
            ListingKind::Listing => NodeKind::Listing(properties),
        })
    }

    /// Append a child, returning it for further nesting
    pub fn push(&mut self, child: Node) -> &mut Node {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// `type` tag as serialized
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            NodeKind::Root(_) => "root",
            NodeKind::Section(_) => "section",
            NodeKind::Text(_) => "text",
            NodeKind::Template(_) => "template",
            NodeKind::See(_) => "see",
            NodeKind::Do(_) => "do",
            NodeKind::Buy(_) => "buy",
            NodeKind::Eat(_) => "eat",
            NodeKind::Drink(_) => "drink",
            NodeKind::Sleep(_) => "sleep",
            NodeKind::Listing(_) => "listing",
            NodeKind::Marker(_) => "marker",
        }
    }

    /// Common listing fields, for any listing kind
    pub fn listing_properties(&self) -> Option<&ListingProperties> {
        match &self.kind {
            NodeKind::See(p)
            | NodeKind::Do(p)
            | NodeKind::Buy(p)
            | NodeKind::Eat(p)
            | NodeKind::Drink(p)
            | NodeKind::Listing(p) => Some(p),
            NodeKind::Sleep(p) => Some(&p.listing),
            _ => None,
        }
    }
}
