//! Closed lookup tables for the SMARD chart-data API.
//!
//! This is the single source of truth for which series identifiers, regions and
//! resolutions exist, and how they are labelled.

/// Every series identifier the pipeline accepts, with its SMARD label.
pub const SERIES_CATALOG: &[(u32, &str)] = &[
    (1223, "Stromerzeugung: Braunkohle"),
    (1224, "Stromerzeugung: Kernenergie"),
    (1225, "Stromerzeugung: Wind Offshore"),
    (1226, "Stromerzeugung: Wasserkraft"),
    (1227, "Stromerzeugung: Sonstige Konventionelle"),
    (1228, "Stromerzeugung: Sonstige Erneuerbare"),
    (4066, "Stromerzeugung: Biomasse"),
    (4067, "Stromerzeugung: Wind Onshore"),
    (4068, "Stromerzeugung: Photovoltaik"),
    (4069, "Stromerzeugung: Steinkohle"),
    (4070, "Stromerzeugung: Pumpspeicher"),
    (4071, "Stromerzeugung: Erdgas"),
    (410, "Stromverbrauch: Gesamt (Netzlast)"),
    (4359, "Stromverbrauch: Residuallast"),
    (4387, "Stromverbrauch: Pumpspeicher"),
    (4169, "Marktpreis: Deutschland/Luxemburg"),
    (5078, "Marktpreis: Anrainer DE/LU"),
    (4996, "Marktpreis: Belgien"),
    (4997, "Marktpreis: Norwegen 2"),
    (4170, "Marktpreis: Österreich"),
    (252, "Marktpreis: Dänemark 1"),
    (253, "Marktpreis: Dänemark 2"),
    (254, "Marktpreis: Frankreich"),
    (255, "Marktpreis: Italien (Nord)"),
    (256, "Marktpreis: Niederlande"),
    (257, "Marktpreis: Polen"),
    (258, "Marktpreis: Polen"),
    (259, "Marktpreis: Schweiz"),
    (260, "Marktpreis: Slowenien"),
    (261, "Marktpreis: Tschechien"),
    (262, "Marktpreis: Ungarn"),
    (3791, "Prognostizierte Erzeugung: Offshore"),
    (123, "Prognostizierte Erzeugung: Onshore"),
    (125, "Prognostizierte Erzeugung: Photovoltaik"),
    (715, "Prognostizierte Erzeugung: Sonstige"),
    (5097, "Prognostizierte Erzeugung: Wind und Photovoltaik"),
    (122, "Prognostizierte Erzeugung: Gesamt"),
];

/// Series retrieved by default, keyed by a file/column-friendly short name.
///
/// Both directions are unique (name <-> id bijection).
pub const SELECTED_SERIES: &[(&str, u32)] = &[
    ("wind_offshore", 1225),
    ("wind_onshore", 4067),
    ("pv", 4068),
    ("residual_load", 4359),
    ("electricity_consumption", 410),
    ("market_price_de", 4169),
    ("forecast_wind_pv", 5097),
];

pub fn series_label(id: u32) -> Option<&'static str> {
    SERIES_CATALOG
        .iter()
        .find(|(known, _)| *known == id)
        .map(|(_, label)| *label)
}

pub fn is_price(id: u32) -> bool {
    series_label(id).is_some_and(|label| label.starts_with("Marktpreis"))
}

pub fn short_name_for(id: u32) -> Option<&'static str> {
    SELECTED_SERIES
        .iter()
        .find(|(_, known)| *known == id)
        .map(|(name, _)| *name)
}

pub fn id_for_short_name(name: &str) -> Option<u32> {
    SELECTED_SERIES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(name))
        .map(|(_, id)| *id)
}
