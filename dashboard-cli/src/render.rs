use std::fmt::Write;

use dashboard_core::{
    DashboardSnapshot, ForecastEntry,
    display::{
        self, ALERT_MESSAGE, ALERT_TITLE, BackgroundCategory, DAILY_FORECAST_DAYS, TimeOfDay,
    },
};

/// Render the dashboard as plain text.
///
/// `local_hour` is the hour of day at the queried location; it only affects
/// the background line.
pub fn render(snapshot: &DashboardSnapshot, local_hour: u32) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_dashboard(&mut out, snapshot, local_hour);
    out
}

fn write_dashboard(
    out: &mut String,
    snapshot: &DashboardSnapshot,
    local_hour: u32,
) -> std::fmt::Result {
    writeln!(out, "Weather Dashboard")?;
    writeln!(out, "=================")?;

    if let Some(error) = &snapshot.error {
        writeln!(out, "{error}")?;
    }

    if snapshot.is_loading() {
        writeln!(out, "Loading...")?;
        return Ok(());
    }

    let Some(data) = &snapshot.data else {
        return Ok(());
    };
    let current = &data.current;

    writeln!(out)?;
    writeln!(out, "{}, {}", current.location_name, current.country)?;
    writeln!(
        out,
        "  {}°C  {}  {}",
        display::round_temperature(current.temperature_c),
        display::condition_icon(&current.condition).glyph(),
        current.description,
    )?;
    writeln!(
        out,
        "  H: {}°C  L: {}°C",
        display::round_temperature(current.temp_max_c),
        display::round_temperature(current.temp_min_c),
    )?;
    writeln!(out)?;
    writeln!(
        out,
        "  Feels Like {}°C | Humidity {}% | Wind {} m/s ({}°) | Pressure {} hPa",
        display::round_temperature(current.feels_like_c),
        current.humidity_pct,
        current.wind_speed_mps,
        current.wind_direction_deg,
        current.pressure_hpa,
    )?;
    writeln!(
        out,
        "  Sunrise {} | Sunset {} | Visibility {} km",
        clock(current.sunrise, current.timezone_offset_secs),
        clock(current.sunset, current.timezone_offset_secs),
        display::visibility_km(current.visibility_m),
    )?;

    let label = display::air_quality_label(data.air_quality.aqi);
    let c = &data.air_quality.components;
    writeln!(out)?;
    writeln!(out, "  Air Quality: {}", label.text)?;
    writeln!(
        out,
        "    PM2.5 {} µg/m³ | PM10 {} µg/m³ | O₃ {} µg/m³ | NO₂ {} µg/m³ | CO {} µg/m³",
        c.pm2_5, c.pm10, c.o3, c.no2, c.co,
    )?;

    writeln!(out)?;
    if snapshot.hourly_view {
        let window = snapshot.hourly_window;
        writeln!(
            out,
            "Hourly Forecast (page {}/{})",
            window.page() + 1,
            DAILY_FORECAST_DAYS
        )?;
        for entry in snapshot.hourly_forecast() {
            let hour = display::format_hour(&entry.timestamp);
            write_forecast_line(out, hour, entry)?;
        }
    } else {
        writeln!(out, "{DAILY_FORECAST_DAYS}-Day Forecast")?;
        for entry in snapshot.daily_forecast() {
            let day = display::format_weekday(&entry.timestamp);
            write_forecast_line(out, day, entry)?;
        }
    }

    if snapshot.severe_weather_alert() {
        writeln!(out)?;
        writeln!(out, "⚠ {ALERT_TITLE}: {ALERT_MESSAGE}")?;
    }

    if let Some(background) = snapshot.background(local_hour) {
        writeln!(out)?;
        writeln!(
            out,
            "Background: {}/{} {}",
            category_name(background.category),
            time_of_day_name(background.time_of_day),
            background.image_url(),
        )?;
    }

    Ok(())
}

fn write_forecast_line(
    out: &mut String,
    label: Option<String>,
    entry: &ForecastEntry,
) -> std::fmt::Result {
    writeln!(
        out,
        "  {:<6} {}  {:>4}°C  {}",
        label.unwrap_or_else(|| entry.timestamp.clone()),
        display::condition_icon(&entry.condition).glyph(),
        display::round_temperature(entry.temperature_c),
        entry.condition,
    )
}

fn clock(unix: i64, offset_secs: i32) -> String {
    display::format_clock_time(unix, offset_secs).unwrap_or_else(|| "--:--".to_string())
}

fn category_name(category: BackgroundCategory) -> &'static str {
    match category {
        BackgroundCategory::Clear => "clear",
        BackgroundCategory::Clouds => "clouds",
        BackgroundCategory::Rain => "rain",
        BackgroundCategory::Snow => "snow",
        BackgroundCategory::Default => "default",
    }
}

fn time_of_day_name(time_of_day: TimeOfDay) -> &'static str {
    match time_of_day {
        TimeOfDay::Day => "day",
        TimeOfDay::Night => "night",
    }
}
