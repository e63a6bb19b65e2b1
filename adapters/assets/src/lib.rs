#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Asset loading orchestration: reads the model catalog, measures every
//! model, and generates the city on a background thread.
//!
//! Individual model failures are never fatal. A template that cannot be
//! measured is logged and left out of the city.

mod catalog;
mod gltf_bounds;

use std::{
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver, TryRecvError},
    thread,
};

pub use catalog::{Catalog, CatalogEntry, DroneEntry, SUPPORTED_CATALOG_VERSION};
pub use gltf_bounds::GltfBoundsLoader;

use neuroflight_core::{Aabb, TemplateId};
use neuroflight_system_worldgen::{
    center_and_scale, CityGenerator, GeneratedCity, LoadedTemplate,
};
use thiserror::Error;

/// Errors raised while reading the catalog or measuring a model.
#[derive(Debug, Error)]
pub enum AssetError {
    /// A file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// A model file could not be parsed.
    #[error("failed to load model {}: {source}", .path.display())]
    Gltf {
        /// File that failed.
        path: PathBuf,
        /// Underlying glTF error.
        source: gltf::Error,
    },
    /// A model parsed but contains no measurable geometry.
    #[error("model {} has no geometry", .path.display())]
    EmptyBounds {
        /// File that failed.
        path: PathBuf,
    },
    /// The catalog declares a format this build cannot read.
    #[error("unsupported catalog version {found}; expected {expected}")]
    UnsupportedManifestVersion {
        /// Version found in the document.
        found: u32,
        /// Version understood by this build.
        expected: u32,
    },
    /// The catalog is not valid TOML or does not match the schema.
    #[error("failed to parse catalog: {0}")]
    Manifest(#[from] toml::de::Error),
    /// The catalog could not be written as TOML.
    #[error("failed to serialise catalog: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Measures the raw bounds of a model file.
pub trait BoundsLoader {
    /// Returns the model-space bounds of every mesh in `file`.
    fn load_bounds(&self, file: &Path) -> Result<Aabb, AssetError>;
}

impl<F> BoundsLoader for F
where
    F: Fn(&Path) -> Result<Aabb, AssetError>,
{
    fn load_bounds(&self, file: &Path) -> Result<Aabb, AssetError> {
        self(file)
    }
}

/// Model that could not be loaded and was left out.
#[derive(Debug)]
pub struct LoadFailure {
    /// Catalog name of the model.
    pub name: String,
    /// Why loading failed.
    pub error: AssetError,
}

/// Everything the frame loop needs once loading finished.
#[derive(Debug, Default)]
pub struct CityLoad {
    /// Generated placements and colliders.
    pub city: GeneratedCity,
    /// Ground-contact height derived from the drone model, if it loaded.
    pub drone_ground_contact: Option<f32>,
    /// Models that were skipped.
    pub failures: Vec<LoadFailure>,
}

/// Measures every catalog model under `root` and generates the city.
pub fn load_city(
    catalog: &Catalog,
    root: &Path,
    loader: &impl BoundsLoader,
    generator: &CityGenerator,
) -> CityLoad {
    let mut failures = Vec::new();
    let mut templates = Vec::with_capacity(catalog.templates.len());

    for (index, entry) in catalog.templates.iter().enumerate() {
        match loader.load_bounds(&root.join(&entry.file)) {
            Ok(raw_bounds) => templates.push(LoadedTemplate {
                id: TemplateId::new(index as u32),
                spec: entry.spec.clone(),
                raw_bounds,
            }),
            Err(error) => {
                tracing::warn!(template = %entry.spec.name, %error, "skipping city template");
                failures.push(LoadFailure {
                    name: entry.spec.name.clone(),
                    error,
                });
            }
        }
    }

    let drone_ground_contact = catalog.drone.as_ref().and_then(|drone| {
        match loader.load_bounds(&root.join(&drone.file)) {
            Ok(raw) => {
                let (bounds, _) = center_and_scale(&raw, drone.target_size, false);
                Some(-bounds.min.y)
            }
            Err(error) => {
                tracing::warn!(%error, "drone model unavailable, keeping default ground contact");
                failures.push(LoadFailure {
                    name: drone.file.display().to_string(),
                    error,
                });
                None
            }
        }
    });

    let city = generator.generate(&templates);
    tracing::info!(
        loaded = templates.len(),
        skipped = failures.len(),
        placements = city.placements.len(),
        "city assets loaded"
    );

    CityLoad {
        city,
        drone_ground_contact,
        failures,
    }
}

/// Runs [`load_city`] off the frame loop.
#[derive(Debug)]
pub struct AssetLoader;

impl AssetLoader {
    /// Starts loading on a background thread and returns a handle to poll.
    pub fn spawn<L>(
        catalog: Catalog,
        root: PathBuf,
        loader: L,
        generator: CityGenerator,
    ) -> LoadHandle
    where
        L: BoundsLoader + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let _ = thread::spawn(move || {
            let load = load_city(&catalog, &root, &loader, &generator);
            let _ = sender.send(load);
        });
        LoadHandle {
            receiver: Some(receiver),
        }
    }
}

/// Receiving end of a background load.
#[derive(Debug)]
pub struct LoadHandle {
    receiver: Option<Receiver<CityLoad>>,
}

impl LoadHandle {
    /// Returns the result once it is available, exactly once.
    ///
    /// A loader thread that died without reporting yields an empty city.
    pub fn try_take(&mut self) -> Option<CityLoad> {
        let receiver = self.receiver.as_ref()?;
        match receiver.try_recv() {
            Ok(load) => {
                self.receiver = None;
                Some(load)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                tracing::warn!("asset loader exited without a result; continuing without colliders");
                self.receiver = None;
                Some(CityLoad::default())
            }
        }
    }

    /// Reports whether a result is still outstanding.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.receiver.is_some()
    }
}
