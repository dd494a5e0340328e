//! Per-node side tables: custom labels, custom colours and CSV columns
//!
//! Annotations are keyed by node handle and stored outside the nodes. The
//! mutator copies them when duplicating a node and drops them when a node is
//! deleted.

use crate::error::{AsmGraphError, Result};
use crate::graph::{AssemblyGraph, NodeId};
use csv::ReaderBuilder;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::Path;

/// An RGBA display colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// SVG colour keywords, alphabetical
const NAMED_COLOURS: &[(&str, [u8; 3])] = &[
    ("aliceblue", [240, 248, 255]),
    ("antiquewhite", [250, 235, 215]),
    ("aqua", [0, 255, 255]),
    ("aquamarine", [127, 255, 212]),
    ("azure", [240, 255, 255]),
    ("beige", [245, 245, 220]),
    ("bisque", [255, 228, 196]),
    ("black", [0, 0, 0]),
    ("blanchedalmond", [255, 235, 205]),
    ("blue", [0, 0, 255]),
    ("blueviolet", [138, 43, 226]),
    ("brown", [165, 42, 42]),
    ("burlywood", [222, 184, 135]),
    ("cadetblue", [95, 158, 160]),
    ("chartreuse", [127, 255, 0]),
    ("chocolate", [210, 105, 30]),
    ("coral", [255, 127, 80]),
    ("cornflowerblue", [100, 149, 237]),
    ("cornsilk", [255, 248, 220]),
    ("crimson", [220, 20, 60]),
    ("cyan", [0, 255, 255]),
    ("darkblue", [0, 0, 139]),
    ("darkcyan", [0, 139, 139]),
    ("darkgoldenrod", [184, 134, 11]),
    ("darkgray", [169, 169, 169]),
    ("darkgreen", [0, 100, 0]),
    ("darkgrey", [169, 169, 169]),
    ("darkkhaki", [189, 183, 107]),
    ("darkmagenta", [139, 0, 139]),
    ("darkolivegreen", [85, 107, 47]),
    ("darkorange", [255, 140, 0]),
    ("darkorchid", [153, 50, 204]),
    ("darkred", [139, 0, 0]),
    ("darksalmon", [233, 150, 122]),
    ("darkseagreen", [143, 188, 143]),
    ("darkslateblue", [72, 61, 139]),
    ("darkslategray", [47, 79, 79]),
    ("darkslategrey", [47, 79, 79]),
    ("darkturquoise", [0, 206, 209]),
    ("darkviolet", [148, 0, 211]),
    ("deeppink", [255, 20, 147]),
    ("deepskyblue", [0, 191, 255]),
    ("dimgray", [105, 105, 105]),
    ("dimgrey", [105, 105, 105]),
    ("dodgerblue", [30, 144, 255]),
    ("firebrick", [178, 34, 34]),
    ("floralwhite", [255, 250, 240]),
    ("forestgreen", [34, 139, 34]),
    ("fuchsia", [255, 0, 255]),
    ("gainsboro", [220, 220, 220]),
    ("ghostwhite", [248, 248, 255]),
    ("gold", [255, 215, 0]),
    ("goldenrod", [218, 165, 32]),
    ("gray", [128, 128, 128]),
    ("grey", [128, 128, 128]),
    ("green", [0, 128, 0]),
    ("greenyellow", [173, 255, 47]),
    ("honeydew", [240, 255, 240]),
    ("hotpink", [255, 105, 180]),
    ("indianred", [205, 92, 92]),
    ("indigo", [75, 0, 130]),
    ("ivory", [255, 255, 240]),
    ("khaki", [240, 230, 140]),
    ("lavender", [230, 230, 250]),
    ("lavenderblush", [255, 240, 245]),
    ("lawngreen", [124, 252, 0]),
    ("lemonchiffon", [255, 250, 205]),
    ("lightblue", [173, 216, 230]),
    ("lightcoral", [240, 128, 128]),
    ("lightcyan", [224, 255, 255]),
    ("lightgoldenrodyellow", [250, 250, 210]),
    ("lightgray", [211, 211, 211]),
    ("lightgreen", [144, 238, 144]),
    ("lightgrey", [211, 211, 211]),
    ("lightpink", [255, 182, 193]),
    ("lightsalmon", [255, 160, 122]),
    ("lightseagreen", [32, 178, 170]),
    ("lightskyblue", [135, 206, 250]),
    ("lightslategray", [119, 136, 153]),
    ("lightslategrey", [119, 136, 153]),
    ("lightsteelblue", [176, 196, 222]),
    ("lightyellow", [255, 255, 224]),
    ("lime", [0, 255, 0]),
    ("limegreen", [50, 205, 50]),
    ("linen", [250, 240, 230]),
    ("magenta", [255, 0, 255]),
    ("maroon", [128, 0, 0]),
    ("mediumaquamarine", [102, 205, 170]),
    ("mediumblue", [0, 0, 205]),
    ("mediumorchid", [186, 85, 211]),
    ("mediumpurple", [147, 112, 219]),
    ("mediumseagreen", [60, 179, 113]),
    ("mediumslateblue", [123, 104, 238]),
    ("mediumspringgreen", [0, 250, 154]),
    ("mediumturquoise", [72, 209, 204]),
    ("mediumvioletred", [199, 21, 133]),
    ("midnightblue", [25, 25, 112]),
    ("mintcream", [245, 255, 250]),
    ("mistyrose", [255, 228, 225]),
    ("moccasin", [255, 228, 181]),
    ("navajowhite", [255, 222, 173]),
    ("navy", [0, 0, 128]),
    ("oldlace", [253, 245, 230]),
    ("olive", [128, 128, 0]),
    ("olivedrab", [107, 142, 35]),
    ("orange", [255, 165, 0]),
    ("orangered", [255, 69, 0]),
    ("orchid", [218, 112, 214]),
    ("palegoldenrod", [238, 232, 170]),
    ("palegreen", [152, 251, 152]),
    ("paleturquoise", [175, 238, 238]),
    ("palevioletred", [219, 112, 147]),
    ("papayawhip", [255, 239, 213]),
    ("peachpuff", [255, 218, 185]),
    ("peru", [205, 133, 63]),
    ("pink", [255, 192, 203]),
    ("plum", [221, 160, 221]),
    ("powderblue", [176, 224, 230]),
    ("purple", [128, 0, 128]),
    ("red", [255, 0, 0]),
    ("rosybrown", [188, 143, 143]),
    ("royalblue", [65, 105, 225]),
    ("saddlebrown", [139, 69, 19]),
    ("salmon", [250, 128, 114]),
    ("sandybrown", [244, 164, 96]),
    ("seagreen", [46, 139, 87]),
    ("seashell", [255, 245, 238]),
    ("sienna", [160, 82, 45]),
    ("silver", [192, 192, 192]),
    ("skyblue", [135, 206, 235]),
    ("slateblue", [106, 90, 205]),
    ("slategray", [112, 128, 144]),
    ("slategrey", [112, 128, 144]),
    ("snow", [255, 250, 250]),
    ("springgreen", [0, 255, 127]),
    ("steelblue", [70, 130, 180]),
    ("tan", [210, 180, 140]),
    ("teal", [0, 128, 128]),
    ("thistle", [216, 191, 216]),
    ("tomato", [255, 99, 71]),
    ("turquoise", [64, 224, 208]),
    ("violet", [238, 130, 238]),
    ("wheat", [245, 222, 179]),
    ("white", [255, 255, 255]),
    ("whitesmoke", [245, 245, 245]),
    ("yellow", [255, 255, 0]),
    ("yellowgreen", [154, 205, 50]),
];

/// Palette handed out, in order, to categorical colour values
const PRESET_COLOURS: &[[u8; 3]] = &[
    [0x30, 0x6F, 0xF8],
    [0xEB, 0x4F, 0x34],
    [0x3B, 0xB9, 0x3F],
    [0xF3, 0xA2, 0x1E],
    [0x8B, 0x4E, 0xC2],
    [0x1F, 0xBE, 0xBD],
    [0xE4, 0x5E, 0xA8],
    [0x9C, 0x6C, 0x3E],
    [0x7F, 0x7F, 0x7F],
    [0xBC, 0xBD, 0x22],
    [0x17, 0x4A, 0x7E],
    [0xA3, 0x1F, 0x34],
    [0x24, 0x6E, 0x2B],
    [0xB5, 0x6A, 0x0B],
    [0x57, 0x2E, 0x82],
    [0x0F, 0x7C, 0x7B],
    [0xF5, 0x9B, 0xC9],
    [0xC9, 0xA6, 0x7E],
    [0xBF, 0xBF, 0xBF],
    [0xDD, 0xDE, 0x8A],
];

impl Colour {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#RRGGBB`, `#AARRGGBB` or a colour name
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some(hex) = text.strip_prefix('#') {
            let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
            return match hex.len() {
                6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
                8 => Some(Self {
                    a: byte(0)?,
                    r: byte(2)?,
                    g: byte(4)?,
                    b: byte(6)?,
                }),
                _ => None,
            };
        }
        let lower = text.to_ascii_lowercase();
        NAMED_COLOURS
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, [r, g, b])| Self::rgb(*r, *g, *b))
    }

    /// The `index`th palette entry, wrapping around
    pub fn preset(index: usize) -> Self {
        let [r, g, b] = PRESET_COLOURS[index % PRESET_COLOURS.len()];
        Self::rgb(r, g, b)
    }

    /// A colour name if one matches exactly, otherwise hex
    pub fn name(&self) -> String {
        if self.a == 255 {
            if let Some((name, _)) = NAMED_COLOURS
                .iter()
                .find(|(_, rgb)| *rgb == [self.r, self.g, self.b])
            {
                return name.to_string();
            }
        }
        self.to_string()
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.a, self.r, self.g, self.b)
        }
    }
}

/// Custom labels, colours and CSV data for nodes
#[derive(Debug, Clone, Default)]
pub struct Annotations {
    labels: HashMap<NodeId, String>,
    colours: HashMap<NodeId, Colour>,
    csv_data: HashMap<NodeId, Vec<String>>,
    csv_columns: Vec<String>,
}

impl Annotations {
    pub fn label(&self, id: NodeId) -> Option<&str> {
        self.labels.get(&id).map(String::as_str)
    }

    /// Tabs are replaced so the label stays a single GFA field
    pub fn set_label(&mut self, id: NodeId, label: &str) {
        if label.is_empty() {
            self.labels.remove(&id);
        } else {
            self.labels.insert(id, label.replace('\t', "    "));
        }
    }

    pub fn colour(&self, id: NodeId) -> Option<Colour> {
        self.colours.get(&id).copied()
    }

    pub fn set_colour(&mut self, id: NodeId, colour: Colour) {
        self.colours.insert(id, colour);
    }

    pub fn csv_data(&self, id: NodeId) -> &[String] {
        self.csv_data.get(&id).map_or(&[], Vec::as_slice)
    }

    /// A single CSV cell, empty if absent
    pub fn csv_value(&self, id: NodeId, column: usize) -> &str {
        self.csv_data(id).get(column).map_or("", String::as_str)
    }

    pub fn set_csv_data(&mut self, id: NodeId, data: Vec<String>) {
        if data.is_empty() {
            self.csv_data.remove(&id);
        } else {
            self.csv_data.insert(id, data);
        }
    }

    pub fn csv_columns(&self) -> &[String] {
        &self.csv_columns
    }

    pub fn clear_csv_data(&mut self) {
        self.csv_data.clear();
        self.csv_columns.clear();
    }

    /// Give `to` a copy of everything attached to `from`
    pub(crate) fn copy_node(&mut self, from: NodeId, to: NodeId) {
        if let Some(label) = self.labels.get(&from).cloned() {
            self.labels.insert(to, label);
        }
        if let Some(colour) = self.colours.get(&from).copied() {
            self.colours.insert(to, colour);
        }
        if let Some(data) = self.csv_data.get(&from).cloned() {
            self.csv_data.insert(to, data);
        }
    }

    pub(crate) fn remove_node(&mut self, id: NodeId) {
        self.labels.remove(&id);
        self.colours.remove(&id);
        self.csv_data.remove(&id);
    }
}

/// Outcome of a CSV import
#[derive(Debug, Clone, Default)]
pub struct CsvImportReport {
    /// Column headers after the node column
    pub columns: Vec<String>,
    /// Rows whose first column matched no node
    pub unmatched_rows: usize,
    /// Whether a colour column was found
    pub colours_loaded: bool,
}

/// Extract a node name from the first CSV column
///
/// Accepts an exact node name, a name missing its sign (`+` is assumed), or
/// contig-style labels such as `NODE_6+_length_50434_cov_42.36`.
pub fn node_name_from_string(graph: &AssemblyGraph, text: &str) -> Option<String> {
    if graph.contains_node(text) {
        return Some(text.to_string());
    }
    let positive = format!("{}+", text);
    if graph.contains_node(&positive) {
        return Some(positive);
    }

    let mut parts: Vec<&str> = text.split('_').collect();
    if parts.first() == Some(&"NODE") {
        parts.remove(0);
    }
    if parts.is_empty() {
        return None;
    }

    let name = if parts.len() == 5 && parts[1] == "length" {
        parts[0].to_string()
    } else if parts.len() == 1 {
        parts[0].to_string()
    } else {
        parts
            .iter()
            .take_while(|&&p| p != "length")
            .copied()
            .collect::<Vec<_>>()
            .join("_")
    };

    if name.is_empty() {
        None
    } else if name.ends_with('+') || name.ends_with('-') {
        Some(name)
    } else {
        Some(format!("{}+", name))
    }
}

impl AssemblyGraph {
    /// Import per-node annotations from a CSV or TSV file
    pub fn load_csv<P: AsRef<Path>>(&mut self, path: P) -> Result<CsvImportReport> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AsmGraphError::FileNotFound(path.display().to_string()));
        }
        self.load_csv_from_reader(fs::File::open(path)?)
    }

    /// Import per-node annotations; the delimiter is sniffed from the header
    pub fn load_csv_from_reader<R: Read>(&mut self, mut reader: R) -> Result<CsvImportReport> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;

        let header = text.lines().next().unwrap_or("");
        let delimiter = if header.contains('\t') {
            b'\t'
        } else if header.contains(',') {
            b','
        } else {
            return Err(AsmGraphError::InvalidInput(
                "Neither tab nor comma in first line".to_string(),
            ));
        };

        let mut rdr = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut columns: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        if columns.len() < 2 {
            return Err(AsmGraphError::InvalidInput(
                "Not enough CSV headers: at least two required".to_string(),
            ));
        }
        columns.remove(0);

        let colour_column = columns.iter().position(|h| {
            let h = h.to_ascii_lowercase();
            h == "colour" || h == "color"
        });

        self.annotations.clear_csv_data();
        let mut report = CsvImportReport {
            columns: columns.clone(),
            unmatched_rows: 0,
            colours_loaded: colour_column.is_some(),
        };
        let mut categories: HashMap<String, Colour> = HashMap::new();

        for record in rdr.records() {
            let record = record?;
            let mut cells: Vec<String> = record.iter().map(str::to_string).collect();
            if cells.is_empty() {
                continue;
            }
            let key = cells.remove(0);

            let colour = colour_column
                .and_then(|col| cells.get(col))
                .filter(|value| !value.is_empty())
                .map(|value| {
                    Colour::parse(value).unwrap_or_else(|| {
                        let next = categories.len();
                        *categories
                            .entry(value.clone())
                            .or_insert_with(|| Colour::preset(next))
                    })
                });
            cells.truncate(columns.len());

            match node_name_from_string(self, &key).and_then(|name| self.node_id(&name)) {
                Some(id) => {
                    self.annotations.set_csv_data(id, cells);
                    if let Some(colour) = colour {
                        self.annotations.set_colour(id, colour);
                    }
                }
                None => report.unmatched_rows += 1,
            }
        }

        self.annotations.csv_columns = columns;
        if report.unmatched_rows > 0 {
            tracing::warn!("{} unmatched entries in the CSV", report.unmatched_rows);
        }
        Ok(report)
    }
}
