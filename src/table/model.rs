use csv::StringRecord;

/// A raw input point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub longitude: f64,
    pub latitude: f64,
}

impl Coordinate {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// The `[longitude, latitude]` order the snap API expects.
    pub fn as_lon_lat(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

/// A point moved onto the road network, one per submitted [`Coordinate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnappedPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// In-memory CSV table.
///
/// Rows keep every input field verbatim. The coordinate pair of each row is
/// parsed once at load time and stored alongside, index-aligned with `rows`.
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<StringRecord>,
    coordinates: Vec<Coordinate>,
}

impl Table {
    pub(crate) fn new(
        headers: Vec<String>,
        rows: Vec<StringRecord>,
        coordinates: Vec<Coordinate>,
    ) -> Self {
        debug_assert_eq!(rows.len(), coordinates.len());
        Self {
            headers,
            rows,
            coordinates,
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[StringRecord] {
        &self.rows
    }

    pub fn coordinates(&self) -> &[Coordinate] {
        &self.coordinates
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the position of a header by exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}
