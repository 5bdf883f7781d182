//! Site catalog - the points of interest shown on the terrain
//!
//! The catalog is authored outside the viewer. The viewer only reads it:
//! each render projects every site and draws a marker for it.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use crate::geo::GeoOrigin;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read site catalog: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse site catalog: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Duplicate site id in catalog: {0}")]
    DuplicateId(String),
}

/// A point of interest in the exhibition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Classification shown in the page chrome (stele, ruin, building, ...)
    #[serde(rename = "type", default)]
    pub site_type: String,
    /// Decimal degrees
    pub latitude: f64,
    /// Decimal degrees
    pub longitude: f64,
    /// Marker height above the origin plane in meters
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub images: Vec<SiteImage>,
}

/// Gallery image: either a bare URL or a URL with framing hints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SiteImage {
    Url(String),
    Framed {
        url: String,
        #[serde(default)]
        display: Option<ImageDisplay>,
    },
}

impl SiteImage {
    pub fn url(&self) -> &str {
        match self {
            SiteImage::Url(url) => url,
            SiteImage::Framed { url, .. } => url,
        }
    }
}

/// Crop position (percent, 50/50 = centered) and zoom for a gallery image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDisplay {
    #[serde(default)]
    pub position: Option<ImagePosition>,
    #[serde(default)]
    pub scale: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImagePosition {
    pub x: f64,
    pub y: f64,
}

impl Site {
    /// Local position of this site relative to `origin`
    pub fn project(&self, origin: &GeoOrigin) -> DVec3 {
        origin.project(self.latitude, self.longitude, self.height.unwrap_or(0.0))
    }
}

/// Ordered list of sites
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteCatalog {
    sites: Vec<Site>,
}

impl SiteCatalog {
    pub fn new(sites: Vec<Site>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for site in &sites {
            if !seen.insert(site.id.as_str()) {
                return Err(CatalogError::DuplicateId(site.id.clone()));
            }
        }
        Ok(Self { sites })
    }

    /// Load a catalog from a JSON array of sites
    pub fn from_json(content: &str) -> Result<Self, CatalogError> {
        let sites: Vec<Site> = serde_json::from_str(content)?;
        Self::new(sites)
    }

    /// Load a catalog from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn get(&self, id: &str) -> Option<&Site> {
        self.sites.iter().find(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Site> {
        self.sites.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {
            "id": "1",
            "name": "Zhishan Rock Site",
            "description": "Multi-layer prehistoric site",
            "type": "ruin",
            "latitude": 25.102,
            "longitude": 121.523,
            "height": 50,
            "category": "archaeology"
        },
        {
            "id": "2",
            "name": "Zhishan Rock Stele",
            "latitude": 25.103,
            "longitude": 121.524
        }
    ]"#;

    #[test]
    fn test_parse_catalog() {
        let catalog = SiteCatalog::from_json(SAMPLE).unwrap();
        assert_eq!(catalog.len(), 2);

        let first = catalog.get("1").unwrap();
        assert_eq!(first.site_type, "ruin");
        assert_eq!(first.height, Some(50.0));
        assert_eq!(first.category.as_deref(), Some("archaeology"));

        let second = catalog.get("2").unwrap();
        assert_eq!(second.height, None);
        assert!(second.description.is_empty());
        assert!(second.images.is_empty());

        assert!(catalog.get("3").is_none());
    }

    #[test]
    fn test_order_preserved() {
        let catalog = SiteCatalog::from_json(SAMPLE).unwrap();
        let ids: Vec<&str> = catalog.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let json = r#"[
            {"id": "a", "name": "A", "latitude": 0, "longitude": 0},
            {"id": "a", "name": "B", "latitude": 1, "longitude": 1}
        ]"#;
        match SiteCatalog::from_json(json) {
            Err(CatalogError::DuplicateId(id)) => assert_eq!(id, "a"),
            other => panic!("expected duplicate id error, got {:?}", other),
        }
    }

    #[test]
    fn test_site_projection_uses_height() {
        let catalog = SiteCatalog::from_json(SAMPLE).unwrap();
        let origin = GeoOrigin::default();

        let p = catalog.get("1").unwrap().project(&origin);
        assert_eq!(p, DVec3::new(0.0, 50.0, 0.0));

        // Missing height projects onto the ground plane
        let p = catalog.get("2").unwrap().project(&origin);
        assert_eq!(p.y, 0.0);
    }

    #[test]
    fn test_images_accept_both_shapes() {
        let json = r#"[{
            "id": "s", "name": "S", "latitude": 0, "longitude": 0,
            "images": [
                "/img/plain.jpg",
                {"url": "/img/framed.jpg", "display": {"position": {"x": 25, "y": 40}, "scale": 1.5}},
                {"url": "/img/bare.jpg"}
            ]
        }]"#;
        let catalog = SiteCatalog::from_json(json).unwrap();
        let images = &catalog.get("s").unwrap().images;
        let urls: Vec<&str> = images.iter().map(SiteImage::url).collect();
        assert_eq!(urls, vec!["/img/plain.jpg", "/img/framed.jpg", "/img/bare.jpg"]);

        match &images[1] {
            SiteImage::Framed {
                display: Some(display),
                ..
            } => {
                assert_eq!(display.scale, Some(1.5));
                assert_eq!(display.position, Some(ImagePosition { x: 25.0, y: 40.0 }));
            }
            other => panic!("expected framed image, got {:?}", other),
        }
        assert_eq!(
            images[2],
            SiteImage::Framed {
                url: "/img/bare.jpg".to_string(),
                display: None
            }
        );
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            SiteCatalog::from_json("{not json"),
            Err(CatalogError::ParseError(_))
        ));
    }
}
