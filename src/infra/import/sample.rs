use chrono::{DateTime, Duration, Local};

pub const WATER_LEVEL_COLLECTION: &str = "water_levels";

const STATIONS: [(&str, &str); 8] = [
    ("PDA Bendung Colo", "Bengawan Solo"),
    ("PDA Jurug", "Bengawan Solo"),
    ("PDA Napel", "Bengawan Solo"),
    ("PDA Serenan", "Bengawan Solo"),
    ("PDA Kajangan", "Kali Madiun"),
    ("PDA Wonokerto", "Kali Madiun"),
    ("PDA Nambangan", "Kali Lamong"),
    ("PDA Sumberagung", "Kali Brantas"),
];

pub fn water_level_sample(now: DateTime<Local>, hours: i64) -> (Vec<String>, Vec<Vec<String>>) {
    let columns = ["id", "station", "river", "level_cm", "status", "recorded_at"]
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for hour in 0..hours.max(0) {
        let recorded_at = now - Duration::hours(hour);
        for (idx, (station, river)) in STATIONS.iter().enumerate() {
            let level = 120 + ((idx as i64 * 37 + hour * 13) % 180);
            let status = match level {
                level if level >= 270 => "Awas",
                level if level >= 230 => "Siaga",
                level if level >= 190 => "Waspada",
                _ => "Normal",
            };
            rows.push(vec![
                format!("WL-{:03}-{:03}", idx + 1, hour),
                station.to_string(),
                river.to_string(),
                level.to_string(),
                status.to_string(),
                recorded_at.format("%Y-%m-%d %H:00").to_string(),
            ]);
        }
    }

    (columns, rows)
}
