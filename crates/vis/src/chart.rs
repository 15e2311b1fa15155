use logcube_analytics::cube::Bucket;
use serde::Serialize;

use crate::error::Result;
use crate::id::Id;

/// A chart of the report page with its Plotly specification serialized as
/// JSON.
#[derive(Serialize, Debug)]
pub struct Chart {
    pub id: Id,
    pub title: String,
    pub spec: String,
}

impl Chart {
    pub fn new(id: Id, title: impl Into<String>, spec: &Spec) -> Result<Chart> {
        Ok(Self {
            id,
            title: title.into(),
            spec: script_safe(serde_json::to_string(spec)?),
        })
    }
}

/// Escapes the characters that could end the inline `<script>` element the
/// spec is written into. The escapes are still valid JSON string escapes.
fn script_safe(json: String) -> String {
    if !json.contains(['<', '>', '&']) {
        return json;
    }

    let mut escaped = String::with_capacity(json.len() + 16);
    for c in json.chars() {
        match c {
            '<' => escaped.push_str("\\u003c"),
            '>' => escaped.push_str("\\u003e"),
            '&' => escaped.push_str("\\u0026"),
            c => escaped.push(c),
        }
    }

    escaped
}

/// The names of the two global arrays that hold the points of a series.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Series {
    pub(crate) name: String,
    pub(crate) xs: String,
    pub(crate) ys: String,
}

impl Series {
    pub fn new(name: String, number: u32) -> Series {
        Self {
            name,
            xs: format!("xs{number}"),
            ys: format!("ys{number}"),
        }
    }
}

/// A located region and the number of records attributed to it.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionPoint {
    pub name: String,
    pub longitude: f64,
    pub latitude: f64,
    pub count: u64,
}

#[derive(Serialize, Debug)]
pub struct Spec {
    traces: Vec<Trace>,
    layout: Layout,
}

impl Spec {
    /// A stacked area chart with one trace per series, read from the
    /// series' global arrays when the page loads.
    pub fn stacked_time_series(series: &[Series]) -> Spec {
        let traces = series
            .iter()
            .map(|series| Trace::Scatter {
                name: series.name.clone(),
                mode: "lines",
                stackgroup: "one",
                xs: series.xs.clone(),
                ys: series.ys.clone(),
            })
            .collect();

        Self {
            traces,
            layout: Layout {
                show_legend: true,
                x_axis: Some(Axis::date()),
                ..Layout::default()
            },
        }
    }

    pub fn bar(buckets: &[Bucket]) -> Spec {
        let (x, y) = split(buckets);

        Self {
            traces: vec![Trace::Bar { x, y }],
            layout: Layout::default(),
        }
    }

    pub fn pie(buckets: &[Bucket]) -> Spec {
        let (labels, values) = split(buckets);

        Self {
            traces: vec![Trace::Pie { labels, values }],
            layout: Layout {
                show_legend: true,
                ..Layout::default()
            },
        }
    }

    /// Regions as markers on a world map, sized by record count.
    pub fn region_map(points: &[RegionPoint]) -> Spec {
        let largest = points.iter().map(|p| p.count).max().unwrap_or(1).max(1) as f64;
        let size = points
            .iter()
            .map(|p| 6.0 + 34.0 * (p.count as f64 / largest).sqrt())
            .collect();

        let trace = Trace::Scattergeo {
            lon: points.iter().map(|p| p.longitude).collect(),
            lat: points.iter().map(|p| p.latitude).collect(),
            text: points
                .iter()
                .map(|p| format!("{}: {}", p.name, p.count))
                .collect(),
            marker: Marker { size },
        };

        Self {
            traces: vec![trace],
            layout: Layout {
                geo: Some(Geo {
                    show_countries: true,
                    projection: Projection {
                        kind: "natural earth",
                    },
                }),
                ..Layout::default()
            },
        }
    }

    pub fn table(header: [&str; 2], buckets: &[Bucket]) -> Spec {
        let (keys, counts) = split(buckets);
        let counts = counts.into_iter().map(|count| count.to_string()).collect();

        Self {
            traces: vec![Trace::Table {
                header: Cells {
                    values: header.iter().map(|h| vec![h.to_string()]).collect(),
                },
                cells: Cells {
                    values: vec![keys, counts],
                },
            }],
            layout: Layout::default(),
        }
    }
}

fn split(buckets: &[Bucket]) -> (Vec<String>, Vec<u64>) {
    buckets
        .iter()
        .map(|bucket| (bucket.key.to_string(), bucket.value))
        .unzip()
}

#[derive(Serialize, Debug)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Trace {
    Scatter {
        name: String,
        mode: &'static str,
        stackgroup: &'static str,
        xs: String,
        ys: String,
    },
    Bar {
        x: Vec<String>,
        y: Vec<u64>,
    },
    Pie {
        labels: Vec<String>,
        values: Vec<u64>,
    },
    Scattergeo {
        lon: Vec<f64>,
        lat: Vec<f64>,
        text: Vec<String>,
        marker: Marker,
    },
    Table {
        header: Cells,
        cells: Cells,
    },
}

#[derive(Serialize, Debug)]
struct Marker {
    size: Vec<f64>,
}

#[derive(Serialize, Debug)]
struct Cells {
    values: Vec<Vec<String>>,
}

#[derive(Serialize, Debug)]
struct Layout {
    #[serde(rename = "showlegend")]
    show_legend: bool,
    #[serde(rename = "autosize")]
    auto_size: bool,
    height: u32,
    #[serde(rename = "xaxis", skip_serializing_if = "Option::is_none")]
    x_axis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    geo: Option<Geo>,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            show_legend: false,
            auto_size: true,
            height: 400,
            x_axis: None,
            geo: None,
        }
    }
}

#[derive(Serialize, Debug)]
struct Axis {
    #[serde(rename = "type")]
    kind: &'static str,
}

impl Axis {
    fn date() -> Self {
        Self { kind: "date" }
    }
}

#[derive(Serialize, Debug)]
struct Geo {
    #[serde(rename = "showcountries")]
    show_countries: bool,
    projection: Projection,
}

#[derive(Serialize, Debug)]
struct Projection {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use logcube_analytics::cube::Key;
    use serde_json::Value;
    use serde_json::json;

    fn buckets() -> Vec<Bucket> {
        vec![
            Bucket {
                key: Key::from("JSTOR"),
                value: 3,
            },
            Bucket {
                key: Key::from("Wiley"),
                value: 1,
            },
        ]
    }

    #[test]
    fn time_series_references_global_arrays() {
        let series = vec![
            Series::new(String::from("PDF"), 1),
            Series::new(String::from("HTML"), 2),
        ];

        let spec = serde_json::to_value(Spec::stacked_time_series(&series)).unwrap();

        assert_eq!(spec["traces"][1]["type"], json!("scatter"));
        assert_eq!(spec["traces"][1]["name"], json!("HTML"));
        assert_eq!(spec["traces"][1]["xs"], json!("xs2"));
        assert_eq!(spec["traces"][0]["stackgroup"], json!("one"));
        assert_eq!(spec["layout"]["xaxis"]["type"], json!("date"));
    }

    #[test]
    fn bar_chart_lists_keys_and_counts() {
        let spec = serde_json::to_value(Spec::bar(&buckets())).unwrap();

        assert_eq!(
            spec["traces"][0],
            json!({"type": "bar", "x": ["JSTOR", "Wiley"], "y": [3, 1]})
        );
        assert_eq!(spec["layout"].get("geo"), None);
    }

    #[test]
    fn table_has_one_column_per_header() {
        let spec = serde_json::to_value(Spec::table(["Title", "Events"], &buckets())).unwrap();
        let trace = &spec["traces"][0];

        assert_eq!(trace["header"]["values"], json!([["Title"], ["Events"]]));
        assert_eq!(trace["cells"]["values"], json!([["JSTOR", "Wiley"], ["3", "1"]]));
    }

    #[test]
    fn region_markers_grow_with_count() {
        let points = vec![
            RegionPoint {
                name: String::from("Geneva"),
                longitude: 6.1,
                latitude: 46.2,
                count: 100,
            },
            RegionPoint {
                name: String::from("Bern"),
                longitude: 7.4,
                latitude: 46.9,
                count: 25,
            },
        ];

        let spec = serde_json::to_value(Spec::region_map(&points)).unwrap();
        let sizes: Vec<f64> = spec["traces"][0]["marker"]["size"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_f64)
            .collect();

        assert_eq!(sizes, vec![40.0, 23.0]);
        assert_eq!(spec["traces"][0]["text"][1], json!("Bern: 25"));
        assert_eq!(spec["layout"]["geo"]["projection"]["type"], json!("natural earth"));
    }

    #[test]
    fn chart_keeps_serialized_spec() {
        let mut ids = crate::id::Ids::default();

        let chart = Chart::new(ids.next(), "Platforms", &Spec::pie(&buckets())).unwrap();

        assert!(chart.spec.starts_with("{\"traces\":[{\"type\":\"pie\""));
        assert_eq!(chart.title, "Platforms");
    }

    #[test]
    fn spec_cannot_close_its_script_element() {
        let mut ids = crate::id::Ids::default();
        let buckets = vec![Bucket {
            key: Key::from("Notes</script><script>alert(1)</script> & more"),
            value: 1,
        }];

        let spec = Spec::table(["Title", "Events"], &buckets);

        let chart = Chart::new(ids.next(), "Top titles", &spec).unwrap();

        assert!(!chart.spec.contains('<'));
        assert!(!chart.spec.contains('>'));
        assert!(chart.spec.contains("Notes\\u003c/script\\u003e"));
        assert!(chart.spec.contains("\\u0026 more"));

        let parsed: Value = serde_json::from_str(&chart.spec).unwrap();
        assert_eq!(
            parsed["traces"][0]["cells"]["values"][0][0],
            "Notes</script><script>alert(1)</script> & more"
        );
    }
}
