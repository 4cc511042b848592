//! Typed amenity descriptions attached to a parcel.
//!
//! The three groups persist as JSON columns (`infos_generales`,
//! `accessibilite`, `equipements`), so the serde field names follow the stored
//! document keys. Every leaf has a named setter; callers never address fields
//! by string path.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// General description of the land.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct GeneralInfo {
    /// Free-text surface area, e.g. `2 ha`.
    #[serde(rename = "superficie")]
    pub surface_area: String,
    #[serde(rename = "type_terrain")]
    pub terrain_types: Vec<String>,
    #[serde(rename = "type_sol")]
    pub soil_types: Vec<String>,
    #[serde(rename = "environnement")]
    pub environment: Vec<String>,
    #[serde(rename = "vues")]
    pub views: Vec<String>,
}

/// Parking arrangement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Parking {
    #[serde(rename = "type")]
    pub kind: String,
    pub details: String,
}

/// How visitors reach the parcel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Accessibility {
    #[serde(rename = "types_acces")]
    pub access_types: Vec<String>,
    pub parking: Parking,
    #[serde(rename = "chemin_acces")]
    pub access_paths: Vec<String>,
    /// Free-text distance, e.g. `500 m`.
    #[serde(rename = "distance_route_principale")]
    pub distance_to_main_road: String,
}

/// Water supply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Water {
    #[serde(rename = "disponible")]
    pub available: bool,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Electricity supply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Electricity {
    #[serde(rename = "disponible")]
    pub available: bool,
    #[serde(rename = "caracteristiques")]
    pub characteristics: Vec<String>,
}

/// Toilets or showers: availability plus the kinds on offer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Facility {
    #[serde(rename = "disponible")]
    pub available: bool,
    #[serde(rename = "type")]
    pub kinds: Vec<String>,
}

/// Campfire rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Campfire {
    #[serde(rename = "autorise")]
    pub allowed: bool,
    #[serde(rename = "bois_fourni")]
    pub wood_provided: bool,
}

/// Connectivity on site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Internet {
    pub wifi: bool,
    #[serde(rename = "reseau_mobile")]
    pub mobile_network: bool,
}

/// On-site equipment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Equipment {
    #[serde(rename = "eau")]
    pub water: Water,
    #[serde(rename = "electricite")]
    pub electricity: Electricity,
    #[serde(rename = "toilettes")]
    pub toilets: Facility,
    #[serde(rename = "douches")]
    pub showers: Facility,
    #[serde(rename = "cuisine")]
    pub kitchen: Vec<String>,
    #[serde(rename = "abri")]
    pub shelter: Vec<String>,
    #[serde(rename = "mobilier_exterieur")]
    pub outdoor_furniture: Vec<String>,
    #[serde(rename = "feu_camp")]
    pub campfire: Campfire,
    pub internet: Internet,
    #[serde(rename = "gestion_dechets")]
    pub waste_management: Vec<String>,
}

/// Amenity groups for one parcel.
///
/// # Examples
/// ```
/// use parcel_market::domain::ParcelAmenities;
///
/// let amenities = ParcelAmenities::default()
///     .set_water_available(true)
///     .set_wifi(true);
/// assert!(amenities.equipment.water.available);
/// assert!(amenities.equipment.internet.wifi);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ParcelAmenities {
    #[serde(rename = "infos_generales")]
    pub general_info: GeneralInfo,
    #[serde(rename = "accessibilite")]
    pub accessibility: Accessibility,
    #[serde(rename = "equipements")]
    pub equipment: Equipment,
}

macro_rules! leaf_setters {
    ($( $(#[$meta:meta])* $name:ident => $($path:ident).+ : $ty:ty ),* $(,)?) => {
        impl ParcelAmenities {
            $(
                $(#[$meta])*
                #[must_use]
                pub fn $name(mut self, value: impl Into<$ty>) -> Self {
                    self.$($path).+ = value.into();
                    self
                }
            )*
        }
    };
}

leaf_setters! {
    /// Set the free-text surface area.
    set_surface_area => general_info.surface_area: String,
    set_terrain_types => general_info.terrain_types: Vec<String>,
    set_soil_types => general_info.soil_types: Vec<String>,
    set_environment => general_info.environment: Vec<String>,
    set_views => general_info.views: Vec<String>,
    set_access_types => accessibility.access_types: Vec<String>,
    set_parking_kind => accessibility.parking.kind: String,
    set_parking_details => accessibility.parking.details: String,
    set_access_paths => accessibility.access_paths: Vec<String>,
    /// Set the free-text distance to the nearest main road.
    set_distance_to_main_road => accessibility.distance_to_main_road: String,
    set_water_available => equipment.water.available: bool,
    set_water_kind => equipment.water.kind: String,
    set_electricity_available => equipment.electricity.available: bool,
    set_electricity_characteristics => equipment.electricity.characteristics: Vec<String>,
    set_toilets_available => equipment.toilets.available: bool,
    set_toilet_kinds => equipment.toilets.kinds: Vec<String>,
    set_showers_available => equipment.showers.available: bool,
    set_shower_kinds => equipment.showers.kinds: Vec<String>,
    set_kitchen => equipment.kitchen: Vec<String>,
    set_shelter => equipment.shelter: Vec<String>,
    set_outdoor_furniture => equipment.outdoor_furniture: Vec<String>,
    set_campfire_allowed => equipment.campfire.allowed: bool,
    set_campfire_wood_provided => equipment.campfire.wood_provided: bool,
    set_wifi => equipment.internet.wifi: bool,
    set_mobile_network => equipment.internet.mobile_network: bool,
    set_waste_management => equipment.waste_management: Vec<String>,
}
