#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic city generator that lays out templates and extracts colliders.
//!
//! The layout is a pure function of the grid parameters and the list of
//! loaded templates. Regenerating with the same inputs reproduces every
//! placement bit for bit, so the city never needs to be persisted.

mod seed;

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use glam::Vec3;
use neuroflight_core::{Aabb, Collider, PlacementCategory, PlacementRecord, TemplateId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Grid and density parameters of the generated city.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldLayout {
    /// Edge length of the square world, centred on the origin.
    pub world_size: f32,
    /// Distance between parallel road centre lines.
    pub grid_spacing: f32,
    /// Width of each road.
    pub road_width: f32,
    /// Distance between parked cars along a road.
    pub car_spacing: f32,
    /// Number of cars placed per loaded car template.
    pub cars_per_template: usize,
    /// Height at which cars are parked.
    pub car_height: f32,
    /// Distance beyond half a block at which benches sit next to an intersection.
    pub bench_offset: f32,
    /// Maximum number of benches.
    pub bench_limit: usize,
    /// Default cap on placements per prop template.
    pub prop_limit: usize,
    /// Lots whose occupancy roll exceeds this value stay empty.
    pub lot_vacancy_threshold: f64,
    /// Prop candidates whose roll exceeds this value are skipped.
    pub prop_vacancy_threshold: f64,
    /// Lots with both centre coordinates inside this half-extent stay empty.
    pub building_clear_zone: f32,
    /// Car spots with both coordinates inside this half-extent stay empty.
    pub car_clear_zone: f32,
    /// Bench spots with both intersection coordinates inside this half-extent stay empty.
    pub bench_clear_zone: f32,
    /// Prop candidates with both grid coordinates inside this half-extent are skipped.
    pub prop_clear_zone: f32,
}

impl Default for WorldLayout {
    fn default() -> Self {
        Self {
            world_size: 80.0,
            grid_spacing: 8.0,
            road_width: 2.0,
            car_spacing: 3.0,
            cars_per_template: 8,
            car_height: 0.08,
            bench_offset: 1.5,
            bench_limit: 60,
            prop_limit: 25,
            lot_vacancy_threshold: 0.82,
            prop_vacancy_threshold: 0.6,
            building_clear_zone: 3.0,
            car_clear_zone: 8.0,
            bench_clear_zone: 6.0,
            prop_clear_zone: 10.0,
        }
    }
}

impl WorldLayout {
    /// Half of the world edge length.
    #[must_use]
    pub fn half_extent(&self) -> f32 {
        self.world_size * 0.5
    }

    /// Coordinates of every road centre line along one axis.
    pub fn road_lines(&self) -> impl Iterator<Item = f32> {
        let half = f64::from(self.half_extent());
        seed::stepped(-half, half, f64::from(self.grid_spacing), true).map(|line| line as f32)
    }
}

/// Catalog entry describing how a template is sized and placed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateSpec {
    /// Human-readable template name; also feeds the prop seed.
    pub name: String,
    /// Placement rule applied to the template.
    pub category: PlacementCategory,
    /// Size the normalised template is scaled to.
    pub target_size: f32,
    /// Scale by height instead of the largest dimension.
    #[serde(default)]
    pub use_height: bool,
    /// Landmark that appears at most once, in the first eligible lot.
    #[serde(default)]
    pub special: bool,
    /// Cap on the number of placements for scattered props.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_placements: Option<usize>,
}

/// Template whose raw geometry bounds were loaded successfully.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadedTemplate {
    /// Identifier assigned to the template.
    pub id: TemplateId,
    /// Catalog entry for the template.
    pub spec: TemplateSpec,
    /// Bounds of the raw geometry in model units.
    pub raw_bounds: Aabb,
}

/// Template re-centred on its bounds and scaled to its target size.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedTemplate {
    /// Identifier assigned to the template.
    pub id: TemplateId,
    /// Catalog entry for the template.
    pub spec: TemplateSpec,
    /// Bounds after normalisation, centred on the origin.
    pub local_bounds: Aabb,
    /// Uniform scale applied to the raw geometry.
    pub scale: f32,
    /// Raw-space point moved to the origin before scaling.
    pub pivot: Vec3,
}

impl NormalizedTemplate {
    /// Normalises a loaded template.
    #[must_use]
    pub fn from_loaded(template: &LoadedTemplate) -> Self {
        let (local_bounds, scale) = center_and_scale(
            &template.raw_bounds,
            template.spec.target_size,
            template.spec.use_height,
        );
        Self {
            id: template.id,
            spec: template.spec.clone(),
            local_bounds,
            scale,
            pivot: template.raw_bounds.center(),
        }
    }

    fn world_bounds(&self, position: Vec3, rotation: f32) -> Aabb {
        self.local_bounds.transformed(1.0, rotation, position)
    }
}

/// Re-centres `raw` on its own centre and scales it so that either its height
/// or its largest dimension equals `target_size`.
///
/// Returns the normalised bounds and the scale factor. Degenerate dimensions
/// are treated as one unit.
#[must_use]
pub fn center_and_scale(raw: &Aabb, target_size: f32, use_height: bool) -> (Aabb, f32) {
    let size = raw.size();
    let dimension = if use_height {
        size.y
    } else {
        size.max_element()
    };
    let dimension = if dimension.is_finite() && dimension > 0.0 {
        dimension
    } else {
        1.0
    };
    let scale = target_size / dimension;
    let half = size * scale * 0.5;
    (Aabb::from_center_half_extents(Vec3::ZERO, half), scale)
}

/// Placements and colliders of one generated city.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeneratedCity {
    /// Scene-ready placement records in generation order.
    pub placements: Vec<PlacementRecord>,
    /// One collider per placement, in the same order.
    pub colliders: Vec<Collider>,
}

impl GeneratedCity {
    /// Number of placements of the provided category.
    #[must_use]
    pub fn count(&self, category: PlacementCategory) -> usize {
        self.placements
            .iter()
            .filter(|placement| placement.category == category)
            .count()
    }

    fn place(
        &mut self,
        template: &NormalizedTemplate,
        position: Vec3,
        rotation: f32,
        seat_on_ground: bool,
    ) {
        let mut position = position;
        if seat_on_ground {
            let resting = template.world_bounds(Vec3::new(position.x, 0.0, position.z), rotation);
            position.y = -resting.min.y;
        }
        self.placements.push(PlacementRecord {
            template: template.id,
            category: template.spec.category,
            position,
            rotation,
            scale: template.scale,
        });
        self.colliders
            .push(Collider::new(template.world_bounds(position, rotation)));
    }
}

/// Pure generator that turns loaded templates into a city layout.
#[derive(Clone, Debug, Default)]
pub struct CityGenerator {
    layout: WorldLayout,
}

impl CityGenerator {
    /// Creates a generator for the provided grid parameters.
    #[must_use]
    pub fn new(layout: WorldLayout) -> Self {
        Self { layout }
    }

    /// Grid parameters used by the generator.
    #[must_use]
    pub fn layout(&self) -> &WorldLayout {
        &self.layout
    }

    /// Generates the city for the templates that loaded successfully.
    ///
    /// Templates missing from `templates` simply contribute nothing.
    #[must_use]
    pub fn generate(&self, templates: &[LoadedTemplate]) -> GeneratedCity {
        let normalized: Vec<NormalizedTemplate> =
            templates.iter().map(NormalizedTemplate::from_loaded).collect();
        let of = |category: PlacementCategory| -> Vec<&NormalizedTemplate> {
            normalized
                .iter()
                .filter(|template| template.spec.category == category)
                .collect()
        };

        let mut city = GeneratedCity::default();
        self.place_buildings(&of(PlacementCategory::Building), &mut city);
        self.place_cars(&of(PlacementCategory::Car), &mut city);
        if let Some(bench) = of(PlacementCategory::Bench).first() {
            self.place_benches(bench, &mut city);
        }
        for prop in of(PlacementCategory::Prop) {
            self.place_props(prop, &mut city);
        }

        tracing::debug!(
            placements = city.placements.len(),
            templates = normalized.len(),
            "generated city layout"
        );
        city
    }

    fn place_buildings(&self, buildings: &[&NormalizedTemplate], city: &mut GeneratedCity) {
        if buildings.is_empty() {
            return;
        }
        let half = f64::from(self.layout.half_extent());
        let spacing = f64::from(self.layout.grid_spacing);
        let clear = f64::from(self.layout.building_clear_zone);

        let mut special = buildings.iter().copied().find(|template| template.spec.special);
        let pool: Vec<&NormalizedTemplate> = buildings
            .iter()
            .copied()
            .filter(|template| !template.spec.special)
            .collect();

        for gx in seed::stepped(-half, half, spacing, false) {
            for gz in seed::stepped(-half, half, spacing, false) {
                let cx = gx + spacing / 2.0;
                let cz = gz + spacing / 2.0;
                if cx.abs() < clear && cz.abs() < clear {
                    continue;
                }
                let lot = seed::lot_seed(gx, gz);
                if seed::unit(lot, 11.0) > self.layout.lot_vacancy_threshold {
                    continue;
                }

                let template = match special.take() {
                    Some(landmark) => landmark,
                    None => match pick(&pool, seed::unit(lot, 4.0)) {
                        Some(template) => template,
                        None => return,
                    },
                };
                city.place(template, Vec3::new(cx as f32, 0.0, cz as f32), 0.0, true);
            }
        }
    }

    fn place_cars(&self, cars: &[&NormalizedTemplate], city: &mut GeneratedCity) {
        if cars.is_empty() {
            return;
        }
        let half = f64::from(self.layout.half_extent());
        let clear = f64::from(self.layout.car_clear_zone);
        let mut spots = Vec::new();
        for k in seed::stepped(-half, half, f64::from(self.layout.grid_spacing), true) {
            for t in seed::stepped(-half, half, f64::from(self.layout.car_spacing), true) {
                if k.abs() < clear && t.abs() < clear {
                    continue;
                }
                spots.push((k, t, 0.0));
                spots.push((t, k, FRAC_PI_2));
            }
        }

        let quota = spots
            .len()
            .min(cars.len().saturating_mul(self.layout.cars_per_template));
        for (index, (x, z, rotation)) in spots.into_iter().take(quota).enumerate() {
            let template = cars[index % cars.len()];
            let position = Vec3::new(x as f32, self.layout.car_height, z as f32);
            city.place(template, position, rotation as f32, false);
        }
    }

    fn place_benches(&self, bench: &NormalizedTemplate, city: &mut GeneratedCity) {
        let half = f64::from(self.layout.half_extent());
        let spacing = f64::from(self.layout.grid_spacing);
        let clear = f64::from(self.layout.bench_clear_zone);
        let offset = spacing / 2.0 + f64::from(self.layout.bench_offset);
        let mut spots = Vec::new();
        for k in seed::stepped(-half, half, spacing, true) {
            for t in seed::stepped(-half, half, spacing, true) {
                if k.abs() < clear && t.abs() < clear {
                    continue;
                }
                spots.push((k + offset, t, 0.0));
                spots.push((k - offset, t, PI));
                spots.push((k, t + offset, FRAC_PI_2));
                spots.push((k, t - offset, -FRAC_PI_2));
            }
        }

        for (x, z, rotation) in spots.into_iter().take(self.layout.bench_limit) {
            city.place(bench, Vec3::new(x as f32, 0.0, z as f32), rotation as f32, true);
        }
    }

    fn place_props(&self, prop: &NormalizedTemplate, city: &mut GeneratedCity) {
        let half = f64::from(self.layout.half_extent());
        let spacing = f64::from(self.layout.grid_spacing);
        let clear = f64::from(self.layout.prop_clear_zone);
        let base = (prop.spec.name.chars().count() * 17) as f64;
        let limit = prop.spec.max_placements.unwrap_or(self.layout.prop_limit);
        let mut placed = 0;

        for gx in seed::stepped(-half, half, spacing, false) {
            for gz in seed::stepped(-half, half, spacing, false) {
                if placed >= limit {
                    return;
                }
                if gx.abs() < clear && gz.abs() < clear {
                    continue;
                }
                let candidate = seed::prop_seed(gx, gz, base);
                if seed::unit(candidate, 0.0) > self.layout.prop_vacancy_threshold {
                    continue;
                }
                let cx = gx + seed::signed_half(candidate, 1.0) * (spacing - 1.0);
                let cz = gz + seed::signed_half(candidate, 2.0) * (spacing - 1.0);
                let rotation = seed::unit(candidate, 3.0) * TAU;
                city.place(prop, Vec3::new(cx as f32, 0.0, cz as f32), rotation as f32, true);
                placed += 1;
            }
        }
    }
}

fn pick<'a>(pool: &[&'a NormalizedTemplate], roll: f64) -> Option<&'a NormalizedTemplate> {
    if pool.is_empty() {
        return None;
    }
    let index = ((roll * pool.len() as f64).floor() as usize).min(pool.len() - 1);
    Some(pool[index])
}

/// Stable 64-bit digest of a placement list.
///
/// Hashes the exact bit patterns of every record, so two layouts share a
/// fingerprint only when they are bit-for-bit identical.
#[must_use]
pub fn fingerprint(placements: &[PlacementRecord]) -> u64 {
    let mut hasher = Sha256::new();
    for record in placements {
        hasher.update(record.template.get().to_le_bytes());
        hasher.update([category_tag(record.category)]);
        for value in record.position.to_array() {
            hasher.update(value.to_bits().to_le_bytes());
        }
        hasher.update(record.rotation.to_bits().to_le_bytes());
        hasher.update(record.scale.to_bits().to_le_bytes());
    }
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

fn category_tag(category: PlacementCategory) -> u8 {
    match category {
        PlacementCategory::Building => 0,
        PlacementCategory::Car => 1,
        PlacementCategory::Bench => 2,
        PlacementCategory::Prop => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(id: u32, name: &str, category: PlacementCategory, special: bool) -> LoadedTemplate {
        LoadedTemplate {
            id: TemplateId::new(id),
            spec: TemplateSpec {
                name: name.to_owned(),
                category,
                target_size: 4.0,
                use_height: true,
                special,
                max_placements: None,
            },
            raw_bounds: Aabb::new(Vec3::new(10.0, 5.0, 10.0), Vec3::new(12.0, 13.0, 14.0)),
        }
    }

    #[test]
    fn center_and_scale_matches_height_target() {
        let raw = Aabb::new(Vec3::new(10.0, 5.0, 10.0), Vec3::new(12.0, 13.0, 14.0));
        let (bounds, scale) = center_and_scale(&raw, 4.0, true);

        assert!((scale - 0.5).abs() < 1e-6);
        assert!((bounds.size().y - 4.0).abs() < 1e-6);
        assert!(bounds.center().length() < 1e-6);
    }

    #[test]
    fn center_and_scale_uses_largest_dimension_otherwise() {
        let raw = Aabb::new(Vec3::ZERO, Vec3::new(6.0, 2.0, 3.0));
        let (bounds, scale) = center_and_scale(&raw, 1.2, false);

        assert!((scale - 0.2).abs() < 1e-6);
        assert!((bounds.size().max_element() - 1.2).abs() < 1e-6);
    }

    #[test]
    fn center_and_scale_tolerates_flat_geometry() {
        let raw = Aabb::new(Vec3::ZERO, Vec3::new(2.0, 0.0, 2.0));
        let (_, scale) = center_and_scale(&raw, 3.0, true);
        assert!((scale - 3.0).abs() < 1e-6);
    }

    #[test]
    fn special_building_appears_once_in_first_lot() {
        let templates = vec![
            template(0, "Tower", PlacementCategory::Building, false),
            template(1, "Bar", PlacementCategory::Building, true),
        ];
        let city = CityGenerator::default().generate(&templates);
        let buildings: Vec<_> = city
            .placements
            .iter()
            .filter(|placement| placement.category == PlacementCategory::Building)
            .collect();

        assert!(buildings.len() > 1);
        assert_eq!(buildings[0].template, TemplateId::new(1));
        let landmarks = buildings
            .iter()
            .filter(|placement| placement.template == TemplateId::new(1))
            .count();
        assert_eq!(landmarks, 1);
    }

    #[test]
    fn lone_special_template_is_not_repeated() {
        let templates = vec![template(1, "Bar", PlacementCategory::Building, true)];
        let city = CityGenerator::default().generate(&templates);
        assert_eq!(city.count(PlacementCategory::Building), 1);
    }

    #[test]
    fn seated_buildings_rest_on_the_ground() {
        let templates = vec![template(0, "Tower", PlacementCategory::Building, false)];
        let city = CityGenerator::default().generate(&templates);

        for collider in &city.colliders {
            let bottom = collider.bounds().min.y + neuroflight_core::COLLIDER_MARGIN;
            assert!(bottom.abs() < 1e-4, "building floats at {bottom}");
        }
    }

    #[test]
    fn every_placement_has_a_collider() {
        let templates = vec![
            template(0, "Tower", PlacementCategory::Building, false),
            template(1, "Taxi", PlacementCategory::Car, false),
            template(2, "Bench", PlacementCategory::Bench, false),
            template(3, "Rocks", PlacementCategory::Prop, false),
        ];
        let city = CityGenerator::default().generate(&templates);

        assert_eq!(city.placements.len(), city.colliders.len());
        assert_eq!(city.count(PlacementCategory::Car), 8);
        assert_eq!(city.count(PlacementCategory::Bench), 60);
        assert!(city.count(PlacementCategory::Prop) <= 25);
    }

    #[test]
    fn placements_respect_clear_zones() {
        let templates = vec![
            template(0, "Tower", PlacementCategory::Building, false),
            template(1, "Taxi", PlacementCategory::Car, false),
            template(2, "Bench", PlacementCategory::Bench, false),
        ];
        let city = CityGenerator::default().generate(&templates);

        for placement in &city.placements {
            let inside = placement.position.x.abs() < 1.0 && placement.position.z.abs() < 1.0;
            assert!(!inside, "{placement:?} intrudes on the spawn area");
        }
    }

    #[test]
    fn empty_template_list_produces_empty_city() {
        let city = CityGenerator::default().generate(&[]);
        assert!(city.placements.is_empty());
        assert!(city.colliders.is_empty());
    }

    #[test]
    fn fingerprint_distinguishes_layouts() {
        let templates = vec![template(0, "Tower", PlacementCategory::Building, false)];
        let city = CityGenerator::default().generate(&templates);
        let mut shifted = city.placements.clone();
        shifted[0].position.x += 0.001;

        assert_ne!(fingerprint(&city.placements), fingerprint(&shifted));
        assert_eq!(fingerprint(&city.placements), fingerprint(&city.placements.clone()));
    }
}
