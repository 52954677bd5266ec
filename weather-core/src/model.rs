use serde::{Deserialize, Deserializer, Serialize};

/// Snapshot of current conditions for one location, shaped like the
/// weatherapi.com `current.json` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub location: Location,
    pub current: Current,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub country: String,
    pub localtime: String,
}

/// Readings are kept as the text the API sent; units are the API's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Current {
    pub temp_c: f64,
    pub condition: Condition,
    #[serde(deserialize_with = "text_or_number")]
    pub humidity: String,
    #[serde(deserialize_with = "text_or_number")]
    pub wind_kph: String,
    #[serde(deserialize_with = "text_or_number")]
    pub pressure_in: String,
    #[serde(deserialize_with = "text_or_number")]
    pub uv: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub text: String,
    /// Protocol-relative path, e.g. `//cdn.weatherapi.com/weather/64x64/day/116.png`.
    pub icon: String,
}

impl Condition {
    /// Absolute URL of the large (128x128) variant of the condition icon.
    pub fn icon_url(&self) -> String {
        let url = if self.icon.starts_with("//") {
            format!("https:{}", self.icon)
        } else {
            self.icon.clone()
        };

        url.replace("64x64", "128x128")
    }
}

/// State of the most recent fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult {
    Loading,
    Success(WeatherRecord),
    Error(String),
}

impl FetchResult {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, FetchResult::Loading)
    }
}

fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}
