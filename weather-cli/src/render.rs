use weather_core::{FetchResult, WeatherRecord};

/// Formats a record as the weather card shown after a search.
pub fn format_card(data: &WeatherRecord) -> String {
    let location = &data.location;
    let current = &data.current;

    let mut output = format!("{}, {}\n\n", location.name, location.country);
    // Debug formatting keeps the decimal point: 15.0, not 15.
    output.push_str(&format!("  {:?} \u{00b0}c\n", current.temp_c));
    output.push_str(&format!("  {}\n", current.condition.text));
    output.push_str(&format!("  Icon: {}\n\n", current.condition.icon_url()));

    let pairs = [
        ("Humidity", current.humidity.clone()),
        ("Wind Speed", format!("{}km/h", current.wind_kph)),
        ("Pressure", format!("{}Hg", current.pressure_in)),
        ("UV", current.uv.clone()),
        ("Local Time", location.localtime.clone()),
    ];
    for (key, value) in pairs {
        output.push_str(&format!("  {key:<11} {value}\n"));
    }

    output
}

/// Formats whatever the controller last published.
pub fn format_result(result: Option<&FetchResult>) -> String {
    match result {
        None => String::new(),
        Some(FetchResult::Loading) => "Loading...".to_string(),
        Some(FetchResult::Success(data)) => format_card(data),
        Some(FetchResult::Error(message)) => format!("Error: {message}"),
    }
}
