//! Weather files: EPW parsing, Radiance `.wea` output and monthly splitting.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::sim::exposure::error::WeatherError;

/// Number of header lines of a `.wea` file.
pub const WEA_HEADER_LINES: usize = 6;

/// A single hourly weather record.
#[derive(Debug, Clone)]
pub struct HourlyRecord {
    /// Month (1-12).
    pub month: u8,
    /// Day of month (1-31).
    pub day: u8,
    /// Hour (1-24), the record covers the hour ending at this time.
    pub hour: u8,
    /// Global horizontal radiation in Wh/m^2.
    pub global_horizontal_radiation: f64,
    /// Direct normal radiation in Wh/m^2.
    pub direct_normal_radiation: f64,
    /// Diffuse horizontal radiation in Wh/m^2.
    pub diffuse_horizontal_radiation: f64,
}

/// Parsed EPW weather data.
#[derive(Debug, Clone)]
pub struct WeatherData {
    /// Location name.
    pub location: String,
    /// Latitude in degrees (north positive).
    pub latitude: f64,
    /// Longitude in degrees (east positive).
    pub longitude: f64,
    /// Time zone (hours from UTC).
    pub timezone: f64,
    /// Elevation in meters.
    pub elevation: f64,
    pub records: Vec<HourlyRecord>,
}

impl WeatherData {
    /// Parses EPW (EnergyPlus Weather) file content.
    ///
    /// EPW format: 8 header lines followed by hourly data rows.
    /// Each data row has 35 fields, comma-separated.
    pub fn from_epw(content: &str) -> Result<Self> {
        let lines: Vec<&str> = content.lines().collect();
        if lines.len() < 9 {
            anyhow::bail!("EPW file too short: expected at least 9 lines");
        }

        // LOCATION,city,state_province,country,source,WMO,lat,lon,tz,elevation
        let location_fields: Vec<&str> = lines[0].split(',').collect();
        if location_fields.len() < 10 {
            anyhow::bail!("Invalid LOCATION header");
        }

        let location = format!(
            "{}, {}",
            location_fields[1].trim(),
            location_fields[3].trim()
        );
        let parse_header = |idx: usize, what: &str| -> Result<f64> {
            location_fields[idx]
                .trim()
                .parse()
                .with_context(|| format!("Invalid {what}"))
        };
        let latitude = parse_header(6, "latitude")?;
        let longitude = parse_header(7, "longitude")?;
        let timezone = parse_header(8, "timezone")?;
        let elevation = parse_header(9, "elevation")?;

        let mut records = Vec::new();
        for (i, line) in lines.iter().enumerate().skip(8) {
            let fields: Vec<&str> = line.split(',').collect();
            if fields.len() < 35 {
                continue; // Skip malformed lines
            }
            let line_no = i + 1;
            let field = |idx: usize, what: &str| -> Result<f64> {
                fields[idx]
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid {what} at line {line_no}"))
            };
            let int_field = |idx: usize, what: &str| -> Result<u8> {
                fields[idx]
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid {what} at line {line_no}"))
            };

            records.push(HourlyRecord {
                month: int_field(1, "month")?,
                day: int_field(2, "day")?,
                hour: int_field(3, "hour")?,
                global_horizontal_radiation: field(13, "GHR")?,
                direct_normal_radiation: field(14, "DNR")?,
                diffuse_horizontal_radiation: field(15, "DHR")?,
            });
        }

        tracing::debug!(location = %location, hours = records.len(), "parsed EPW weather");

        Ok(Self {
            location,
            latitude,
            longitude,
            timezone,
            elevation,
            records,
        })
    }

    pub fn from_epw_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read EPW file: {}", path.display()))?;
        Self::from_epw(&content)
            .with_context(|| format!("Failed to parse EPW file: {}", path.display()))
    }

    /// Returns the number of hours in the dataset.
    pub fn num_hours(&self) -> usize {
        self.records.len()
    }

    /// Renders the data in Radiance `.wea` format.
    ///
    /// Radiance expects west-positive longitude and the time zone as the
    /// west-positive standard meridian in degrees. Each record is stamped at
    /// the middle of its hour.
    pub fn to_wea(&self) -> String {
        let place = self.location.replace(", ", "_").replace(' ', "_");
        let mut out = format!(
            "place {place}\nlatitude {}\nlongitude {}\ntime_zone {}\nsite_elevation {}\nweather_data_file_units 1\n",
            self.latitude,
            -self.longitude,
            -self.timezone * 15.0,
            self.elevation,
        );
        for r in &self.records {
            out.push_str(&format!(
                "{} {} {} {} {}\n",
                r.month,
                r.day,
                r.hour as f64 - 0.5,
                r.direct_normal_radiation,
                r.diffuse_horizontal_radiation
            ));
        }
        out
    }

    pub fn write_wea(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_wea())
            .with_context(|| format!("Failed to write WEA file: {}", path.display()))
    }
}

/// Splits `.wea` content into 12 monthly `.wea` texts (January first).
///
/// The header is copied verbatim into every month. Data lines are routed
/// by their leading month token; blank lines are skipped. Months without
/// data get the header only.
pub fn split_monthly(content: &str) -> Result<[String; 12], WeatherError> {
    let lines: Vec<&str> = content.lines().collect();
    if lines.len() < WEA_HEADER_LINES {
        return Err(WeatherError::MissingHeader {
            expected: WEA_HEADER_LINES,
            found: lines.len(),
        });
    }

    let mut header = String::new();
    for line in &lines[..WEA_HEADER_LINES] {
        header.push_str(line);
        header.push('\n');
    }
    let mut months: [String; 12] = std::array::from_fn(|_| header.clone());

    for (i, line) in lines.iter().enumerate().skip(WEA_HEADER_LINES) {
        let Some(token) = line.split_whitespace().next() else {
            continue;
        };
        let month = token
            .parse::<u8>()
            .ok()
            .filter(|m| (1..=12).contains(m))
            .ok_or_else(|| WeatherError::BadMonth {
                line: i + 1,
                token: token.to_string(),
            })?;
        let buf = &mut months[(month - 1) as usize];
        buf.push_str(line);
        buf.push('\n');
    }

    Ok(months)
}

/// Path of the monthly file `month` (1-12) derived from `weather`.
///
/// `site.wea` -> `<out_dir>/site_3.wea` for March.
pub fn monthly_path(weather: &Path, out_dir: &Path, month: u8) -> PathBuf {
    let stem = weather
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "weather".to_string());
    out_dir.join(format!("{stem}_{month}.wea"))
}

/// Splits the `.wea` file at `weather` into 12 files inside `out_dir`.
///
/// Returns the written paths, January first.
pub fn write_monthly(weather: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, WeatherError> {
    let content = std::fs::read_to_string(weather).map_err(|source| WeatherError::Read {
        path: weather.to_path_buf(),
        source,
    })?;
    let months = split_monthly(&content)?;

    let mut paths = Vec::with_capacity(12);
    for (idx, text) in months.iter().enumerate() {
        let path = monthly_path(weather, out_dir, (idx + 1) as u8);
        std::fs::write(&path, text).map_err(|source| WeatherError::Write {
            path: path.clone(),
            source,
        })?;
        paths.push(path);
    }
    tracing::debug!(weather = %weather.display(), "split weather file into 12 months");
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::exposure::period::DAYS_IN_MONTH;

    const HEADER: &str = "place Test\nlatitude 52\nlongitude -13\ntime_zone -15\nsite_elevation 50\nweather_data_file_units 1\n";

    #[test]
    fn test_split_routes_by_month() {
        let content = format!("{HEADER}1 1 0.5 0 0\n1 1 1.5 10 5\n\n3 2 12.5 400 100\n");
        let months = split_monthly(&content).unwrap();
        assert_eq!(months[0], format!("{HEADER}1 1 0.5 0 0\n1 1 1.5 10 5\n"));
        assert_eq!(months[1], HEADER);
        assert_eq!(months[2], format!("{HEADER}3 2 12.5 400 100\n"));
        assert!(months[3..].iter().all(|m| m == HEADER));
    }

    #[test]
    fn test_split_bad_month() {
        let content = format!("{HEADER}1 1 0.5 0 0\n13 1 0.5 0 0\n");
        match split_monthly(&content) {
            Err(WeatherError::BadMonth { line, token }) => {
                assert_eq!(line, 8);
                assert_eq!(token, "13");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        let content = format!("{HEADER}x 1 0.5 0 0\n");
        assert!(matches!(
            split_monthly(&content),
            Err(WeatherError::BadMonth { line: 7, .. })
        ));
    }

    #[test]
    fn test_split_missing_header() {
        assert!(matches!(
            split_monthly("place x\nlatitude 1\n"),
            Err(WeatherError::MissingHeader {
                expected: 6,
                found: 2
            })
        ));
    }

    #[test]
    fn test_write_monthly_files() {
        let dir = tempfile::tempdir().unwrap();
        let weather = dir.path().join("site.wea");
        std::fs::write(&weather, format!("{HEADER}6 21 12.5 800 120\n")).unwrap();
        let out = dir.path().join("months");
        std::fs::create_dir(&out).unwrap();

        let paths = write_monthly(&weather, &out).unwrap();
        assert_eq!(paths.len(), 12);
        assert_eq!(paths[5], out.join("site_6.wea"));
        let june = std::fs::read_to_string(&paths[5]).unwrap();
        assert!(june.ends_with("6 21 12.5 800 120\n"));
        let jan = std::fs::read_to_string(&paths[0]).unwrap();
        assert_eq!(jan, HEADER);
    }

    #[test]
    fn test_write_monthly_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let res = write_monthly(&dir.path().join("missing.wea"), dir.path());
        assert!(matches!(res, Err(WeatherError::Read { .. })));
    }

    #[test]
    fn test_epw_parse_minimal() {
        let header = "LOCATION,TestCity,State,Country,Source,123456,52.0,13.0,1.0,50.0\n\
                       DESIGN CONDITIONS,0\n\
                       TYPICAL/EXTREME PERIODS,0\n\
                       GROUND TEMPERATURES,0\n\
                       HOLIDAYS/DAYLIGHT SAVINGS,No,0,0,0\n\
                       COMMENTS 1,test\n\
                       COMMENTS 2,test\n\
                       DATA PERIODS,1,1,Data,Sunday,1/1,12/31\n";

        // year,month,day,hour,minute,source,drybulb,dewpoint,relhum,atmpressure,
        // exthoriz,extdirect,horizinfra,ghr,dnr,dhr,...(remaining filled with 0)
        let data_line = "2020,1,1,12,60,?,5.0,2.0,80,101325,0,0,0,300,200,100,0,0,0,0,180,3.0,0,0,0,0,0,0,0,0,0,0,0,0,0\n";

        let content = format!("{}{}", header, data_line);
        let weather = WeatherData::from_epw(&content).unwrap();

        assert_eq!(weather.location, "TestCity, Country");
        assert!((weather.latitude - 52.0).abs() < 1e-10);
        assert_eq!(weather.records.len(), 1);
        assert!((weather.records[0].direct_normal_radiation - 200.0).abs() < 1e-10);

        let wea = weather.to_wea();
        let lines: Vec<&str> = wea.lines().collect();
        assert_eq!(lines[0], "place TestCity_Country");
        assert_eq!(lines[2], "longitude -13");
        assert_eq!(lines[3], "time_zone -15");
        assert_eq!(lines[5], "weather_data_file_units 1");
        assert_eq!(lines[6], "1 1 11.5 200 100");
    }

    #[test]
    fn test_full_year_wea_splits_into_full_months() {
        let mut records = Vec::with_capacity(8760);
        for (month_idx, &days) in DAYS_IN_MONTH.iter().enumerate() {
            for day in 1..=days {
                for hour in 1..=24u8 {
                    let ghr = if (7..=19).contains(&hour) { 500.0 } else { 0.0 };
                    records.push(HourlyRecord {
                        month: (month_idx + 1) as u8,
                        day: day as u8,
                        hour,
                        global_horizontal_radiation: ghr,
                        direct_normal_radiation: ghr * 0.6,
                        diffuse_horizontal_radiation: ghr * 0.4,
                    });
                }
            }
        }
        let weather = WeatherData {
            location: "Test City".to_string(),
            latitude: 52.0,
            longitude: 13.0,
            timezone: 1.0,
            elevation: 0.0,
            records,
        };
        assert_eq!(weather.num_hours(), 8760);
        let months = split_monthly(&weather.to_wea()).unwrap();
        for (idx, text) in months.iter().enumerate() {
            let data_lines = text.lines().count() - WEA_HEADER_LINES;
            assert_eq!(data_lines, DAYS_IN_MONTH[idx] as usize * 24);
        }
    }
}
