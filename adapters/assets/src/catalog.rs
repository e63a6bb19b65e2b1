use std::{
    fs,
    path::{Path, PathBuf},
};

use neuroflight_core::PlacementCategory;
use neuroflight_system_worldgen::TemplateSpec;
use serde::{Deserialize, Serialize};

use crate::AssetError;

/// Catalog format understood by this build.
pub const SUPPORTED_CATALOG_VERSION: u32 = 1;

const BUILDING_HEIGHT: f32 = 4.0;
const CAR_LENGTH: f32 = 1.2;

/// List of model files that make up the drone and the city.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Format version; only [`SUPPORTED_CATALOG_VERSION`] is accepted.
    pub version: u32,
    /// Drone model, used to derive the ground-contact height.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drone: Option<DroneEntry>,
    /// City templates, in placement order.
    #[serde(default)]
    pub templates: Vec<CatalogEntry>,
}

/// Catalog entry of the drone model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DroneEntry {
    /// Model file relative to the asset root.
    pub file: PathBuf,
    /// Largest dimension the model is scaled to.
    #[serde(default = "unit_size")]
    pub target_size: f32,
}

fn unit_size() -> f32 {
    1.0
}

/// Catalog entry of one city template.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Model file relative to the asset root.
    pub file: PathBuf,
    /// Sizing and placement rules.
    #[serde(flatten)]
    pub spec: TemplateSpec,
}

impl Catalog {
    /// Reads and validates a catalog from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parses and validates a catalog document.
    pub fn from_toml_str(contents: &str) -> Result<Self, AssetError> {
        let catalog: Self = toml::from_str(contents)?;
        if catalog.version != SUPPORTED_CATALOG_VERSION {
            return Err(AssetError::UnsupportedManifestVersion {
                found: catalog.version,
                expected: SUPPORTED_CATALOG_VERSION,
            });
        }
        Ok(catalog)
    }

    /// Serialises the catalog as TOML.
    pub fn to_toml_string(&self) -> Result<String, AssetError> {
        Ok(toml::to_string(self)?)
    }

    /// Stock city pack: eight buildings and the bar, four cars, a bench and
    /// ten scattered props.
    #[must_use]
    pub fn default_city() -> Self {
        let mut templates = Vec::new();
        for name in [
            "Building.glb",
            "Building B.glb",
            "Building-7lMEpT2ICD.glb",
            "Building-bbH2Bg73qM.glb",
            "Building-g15lpKh4li.glb",
            "Building-otRsYa6pan.glb",
            "Building-qOhhGLftam.glb",
            "Building-T3oyvK6VEU.glb",
        ] {
            templates.push(entry(name, PlacementCategory::Building, BUILDING_HEIGHT, true));
        }
        let mut bar = entry("Bar.glb", PlacementCategory::Building, BUILDING_HEIGHT, true);
        bar.file = PathBuf::from("Bar.glb");
        bar.spec.special = true;
        templates.push(bar);

        for name in ["Taxi.glb", "Car Hatchback.glb", "Police Car.glb", "Stationwagon.glb"] {
            templates.push(entry(name, PlacementCategory::Car, CAR_LENGTH, false));
        }

        templates.push(entry("Bench.glb", PlacementCategory::Bench, 0.9, false));

        for (name, target_size, use_height) in [
            ("Base.glb", 3.0, false),
            ("Bush.glb", 0.7, false),
            ("Dumpster.glb", 1.0, true),
            ("Fire Hydrant.glb", 1.0, true),
            ("Rocks.glb", 0.5, false),
            ("Streetlight.glb", 2.5, true),
            ("Traffic light.glb", 1.2, true),
            ("Traffic light-Q6k7Izx6YD.glb", 1.2, true),
            ("Trafficlight B.glb", 1.2, true),
            ("Watertower.glb", 6.0, true),
        ] {
            let mut prop = entry(name, PlacementCategory::Prop, target_size, use_height);
            prop.spec.max_placements = match name {
                "Watertower.glb" => Some(3),
                "Base.glb" => Some(5),
                _ => None,
            };
            templates.push(prop);
        }

        Self {
            version: SUPPORTED_CATALOG_VERSION,
            drone: Some(DroneEntry {
                file: PathBuf::from("Drone.glb"),
                target_size: 1.0,
            }),
            templates,
        }
    }
}

fn entry(name: &str, category: PlacementCategory, target_size: f32, use_height: bool) -> CatalogEntry {
    CatalogEntry {
        file: Path::new("city").join(name),
        spec: TemplateSpec {
            name: name.to_owned(),
            category,
            target_size,
            use_height,
            special: false,
            max_placements: None,
        },
    }
}
