//! Record types for the flat CSV logs kept next to the application.
//! They are shared by the append service and the HTTP handlers, and
//! their field order is the column order on disk.

pub mod converters;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use converters::{json_to_cell, json_to_cell_or};

// ===================== Crop viability =====================

/// Column order of the crop viability log.
pub const CROP_COLUMNS: [&str; 11] = [
    "date",
    "temperatura",
    "radiacion_solar",
    "humedad_suelo",
    "humedad",
    "precipitacion",
    "tomate",
    "banana",
    "cacao",
    "arroz",
    "maiz",
];

/// Value written for a crop flag the client did not send.
pub const CROP_FLAG_DEFAULT: &str = "No";

/// One row of the crop viability log: date, five environmental readings
/// and five yes/no suitability flags.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, Default)]
pub struct CropReading {
    pub date: String,
    pub temperatura: String,
    pub radiacion_solar: String,
    pub humedad_suelo: String,
    pub humedad: String,
    pub precipitacion: String,
    pub tomate: String,
    pub banana: String,
    pub cacao: String,
    pub arroz: String,
    pub maiz: String,
}

impl CropReading {
    /// Maps a free-form payload onto the fixed schema.
    ///
    /// The date is read from `fecha`. Missing readings become empty cells,
    /// missing crop flags become `No`.
    pub fn from_payload(payload: &Map<String, Value>) -> Self {
        let cell = |key: &str| json_to_cell(payload.get(key));
        let flag = |key: &str| json_to_cell_or(payload.get(key), CROP_FLAG_DEFAULT);

        Self {
            date: cell("fecha"),
            temperatura: cell("temperatura"),
            radiacion_solar: cell("radiacion_solar"),
            humedad_suelo: cell("humedad_suelo"),
            humedad: cell("humedad"),
            precipitacion: cell("precipitacion"),
            tomate: flag("tomate"),
            banana: flag("banana"),
            cacao: flag("cacao"),
            arroz: flag("arroz"),
            maiz: flag("maiz"),
        }
    }
}

// ===================== Weather =====================

/// Column order of the weather log.
pub const WEATHER_COLUMNS: [&str; 6] = ["id", "temperatura", "humedad", "lluvia", "uv", "fecha"];

/// One station reading of the weather log.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, Default)]
pub struct WeatherReading {
    pub id: String,
    pub temperatura: String,
    pub humedad: String,
    pub lluvia: String,
    pub uv: String,
    pub fecha: String,
}

impl WeatherReading {
    /// Maps a free-form payload onto the fixed schema, missing fields become empty.
    pub fn from_payload(payload: &Map<String, Value>) -> Self {
        let cell = |key: &str| json_to_cell(payload.get(key));

        Self {
            id: cell("id"),
            temperatura: cell("temperatura"),
            humedad: cell("humedad"),
            lluvia: cell("lluvia"),
            uv: cell("uv"),
            fecha: cell("fecha"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected a JSON object"),
        }
    }

    #[test]
    fn crop_reading_maps_every_column() {
        let payload = object(json!({
            "fecha": "2025-11-20",
            "temperatura": 28.5,
            "radiacion_solar": "640",
            "humedad_suelo": 41,
            "humedad": "63",
            "precipitacion": 0,
            "tomate": "Si",
            "banana": "No",
            "cacao": "Si",
            "arroz": "No",
            "maiz": "Si",
        }));

        let reading = CropReading::from_payload(&payload);

        assert_eq!(reading.date, "2025-11-20");
        assert_eq!(reading.temperatura, "28.5");
        assert_eq!(reading.humedad_suelo, "41");
        assert_eq!(reading.precipitacion, "0");
        assert_eq!(reading.tomate, "Si");
        assert_eq!(reading.maiz, "Si");
    }

    #[test]
    fn crop_reading_defaults() {
        let payload = object(json!({ "temperatura": "30", "cacao": null }));

        let reading = CropReading::from_payload(&payload);

        assert_eq!(reading.date, "");
        assert_eq!(reading.temperatura, "30");
        assert_eq!(reading.humedad, "");
        assert_eq!(reading.tomate, CROP_FLAG_DEFAULT);
        // An explicit null is not a missing flag
        assert_eq!(reading.cacao, "");
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let payload = object(json!({ "fecha": "2025-01-01", "viento": 12 }));
        let reading = CropReading::from_payload(&payload);
        assert_eq!(reading.date, "2025-01-01");
    }

    #[test]
    fn weather_reading_from_payload() {
        let payload = object(json!({
            "id": "2933",
            "temperatura": "28.9",
            "humedad": "63",
            "lluvia": "0",
            "uv": 28.08,
            "fecha": "2025-11-20 21:15:07"
        }));

        let reading = WeatherReading::from_payload(&payload);
        assert_eq!(reading.id, "2933");
        assert_eq!(reading.uv, "28.08");
        assert_eq!(reading.fecha, "2025-11-20 21:15:07");
    }

    #[test]
    fn column_lists_match_record_fields() {
        let header = serde_json::to_value(CropReading::default()).unwrap();
        let keys: Vec<&String> = header.as_object().unwrap().keys().collect();
        // serde_json maps are sorted, compare as sets
        assert_eq!(keys.len(), CROP_COLUMNS.len());
        for column in CROP_COLUMNS {
            assert!(keys.iter().any(|k| k.as_str() == column));
        }
        assert_eq!(WEATHER_COLUMNS.len(), 6);
    }
}
