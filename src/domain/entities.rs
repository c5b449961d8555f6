//! Domain objects returned by the upstream provider and held in the cache.
//!
//! These are immutable value objects. The gateway only moves them between the
//! provider, the cache and the response serializer, so the JSON shape here is
//! also the wire shape served to clients.

use serde::{Deserialize, Serialize};

/// Mission manifest for a single rover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landing_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_sol: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_photos: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photos: Option<Vec<SolSummary>>,
}

/// Per-sol photo counts listed in a manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolSummary {
    pub sol: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earth_date: Option<String>,
    #[serde(default)]
    pub total_photos: u64,
    #[serde(default)]
    pub cameras: Vec<String>,
}

/// A set of photos for one sol or one earth date.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PhotoSet {
    #[serde(default)]
    pub photos: Vec<Photo>,
}

impl PhotoSet {
    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: u64,
    pub sol: u32,
    pub camera: Camera,
    pub img_src: String,
    pub earth_date: String,
    pub rover: RoverSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rover_id: Option<u64>,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoverSummary {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landing_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}
