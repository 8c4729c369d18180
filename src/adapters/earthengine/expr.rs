//! Earth Engine expression graphs.
//!
//! Builds the value-node JSON accepted by `value:compute`. Nodes are nested
//! inline; only function-definition bodies are hoisted into the `values`
//! table, since the API addresses them by key.

use chrono::NaiveDate;
use serde_json::{json, Map, Value};

use crate::domain::{DateWindow, GeoPoint};

/// Argument name used for mapped functions, matching the client libraries.
pub const MAPPING_VAR: &str = "_MAPPING_VAR_0_0";

/// Maximum pixels a single region reduction may touch.
const MAX_PIXELS: f64 = 1e9;

/// A node in an Earth Engine expression graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Constant(Value),
    Call {
        function: &'static str,
        args: Vec<(&'static str, Expr)>,
    },
    Argument(&'static str),
    Lambda {
        params: Vec<&'static str>,
        body: Box<Expr>,
    },
}

impl Expr {
    pub fn constant(value: impl Into<Value>) -> Self {
        Self::Constant(value.into())
    }

    pub fn call<I>(function: &'static str, args: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, Expr)>,
    {
        Self::Call {
            function,
            args: args.into_iter().collect(),
        }
    }

    /// Invocation of a zero-argument algorithm.
    pub fn invoke(function: &'static str) -> Self {
        Self::Call {
            function,
            args: Vec::new(),
        }
    }

    pub fn lambda(params: Vec<&'static str>, body: Expr) -> Self {
        Self::Lambda {
            params,
            body: Box::new(body),
        }
    }

    /// Encode as a `{"result": key, "values": {...}}` expression.
    #[must_use]
    pub fn encode(&self) -> Value {
        let mut encoder = Encoder::default();
        let root = encoder.node(self);
        let result = encoder.store(root);
        json!({ "result": result, "values": encoder.values })
    }
}

impl From<f64> for Expr {
    fn from(v: f64) -> Self {
        Self::constant(v)
    }
}

impl From<&str> for Expr {
    fn from(v: &str) -> Self {
        Self::constant(v)
    }
}

#[derive(Default)]
struct Encoder {
    values: Map<String, Value>,
}

impl Encoder {
    fn node(&mut self, expr: &Expr) -> Value {
        match expr {
            Expr::Constant(v) => json!({ "constantValue": v }),
            Expr::Call { function, args } => {
                let mut arguments = Map::new();
                for (name, arg) in args {
                    arguments.insert((*name).to_string(), self.node(arg));
                }
                json!({
                    "functionInvocationValue": {
                        "functionName": function,
                        "arguments": arguments,
                    }
                })
            }
            Expr::Argument(name) => json!({ "argumentReference": name }),
            Expr::Lambda { params, body } => {
                let body_node = self.node(body);
                let key = self.store(body_node);
                json!({
                    "functionDefinitionValue": {
                        "argumentNames": params,
                        "body": key,
                    }
                })
            }
        }
    }

    fn store(&mut self, node: Value) -> String {
        let key = self.values.len().to_string();
        self.values.insert(key.clone(), node);
        key
    }
}

// Constructors for the platform algorithms the feature sources use.

pub fn image(id: &str) -> Expr {
    Expr::call("Image.load", [("id", Expr::from(id))])
}

pub fn image_collection(id: &str) -> Expr {
    Expr::call("ImageCollection.load", [("id", Expr::from(id))])
}

pub fn constant_image(value: f64) -> Expr {
    Expr::call("Image.constant", [("value", Expr::from(value))])
}

pub fn point(p: GeoPoint) -> Expr {
    Expr::call(
        "GeometryConstructors.Point",
        [("coordinates", Expr::constant(json!(p.coordinates())))],
    )
}

pub fn buffer(geometry: Expr, distance_m: f64) -> Expr {
    Expr::call(
        "Geometry.buffer",
        [("geometry", geometry), ("distance", Expr::from(distance_m))],
    )
}

pub fn select(image: Expr, bands: &[&str]) -> Expr {
    Expr::call(
        "Image.select",
        [("input", image), ("bandSelectors", Expr::constant(json!(bands)))],
    )
}

pub fn rename(image: Expr, name: &str) -> Expr {
    Expr::call(
        "Image.rename",
        [("input", image), ("names", Expr::constant(json!([name])))],
    )
}

/// Two-image arithmetic or logic (`Image.multiply`, `Image.and`, ...).
pub fn image_op(function: &'static str, a: Expr, b: Expr) -> Expr {
    Expr::call(function, [("image1", a), ("image2", b)])
}

pub fn normalized_difference(image: Expr, a: &str, b: &str) -> Expr {
    Expr::call(
        "Image.normalizedDifference",
        [("input", image), ("bandNames", Expr::constant(json!([a, b])))],
    )
}

/// First pixel of each band within `geometry`, as a dictionary keyed by band.
pub fn first_in_region(image: Expr, geometry: Expr, scale: Expr) -> Expr {
    Expr::call(
        "Image.reduceRegion",
        [
            ("image", image),
            ("reducer", Expr::invoke("Reducer.first")),
            ("geometry", geometry),
            ("scale", scale),
            ("maxPixels", Expr::from(MAX_PIXELS)),
        ],
    )
}

pub fn date(d: NaiveDate) -> Expr {
    Expr::call("Date", [("value", Expr::constant(d.to_string()))])
}

pub fn filter_bounds(collection: Expr, geometry: Expr) -> Expr {
    let filter = Expr::call(
        "Filter.intersects",
        [("leftField", Expr::from(".all")), ("rightValue", geometry)],
    );
    Expr::call("Collection.filter", [("collection", collection), ("filter", filter)])
}

pub fn filter_date(collection: Expr, window: DateWindow) -> Expr {
    let range = Expr::call(
        "DateRange",
        [("start", date(window.start)), ("end", date(window.end))],
    );
    let filter = Expr::call(
        "Filter.dateRangeContains",
        [("leftValue", range), ("rightField", Expr::from("system:time_start"))],
    );
    Expr::call("Collection.filter", [("collection", collection), ("filter", filter)])
}

pub fn filter_less_than(collection: Expr, property: &str, value: f64) -> Expr {
    let filter = Expr::call(
        "Filter.lessThan",
        [("leftField", Expr::from(property)), ("rightValue", Expr::from(value))],
    );
    Expr::call("Collection.filter", [("collection", collection), ("filter", filter)])
}

pub fn map(collection: Expr, function: Expr) -> Expr {
    Expr::call("Collection.map", [("collection", collection), ("baseAlgorithm", function)])
}

pub fn size(collection: Expr) -> Expr {
    Expr::call("Collection.size", [("collection", collection)])
}

pub fn first(collection: Expr) -> Expr {
    Expr::call("Collection.first", [("collection", collection)])
}

/// Per-pixel reduction across a collection; output bands get a `_<reducer>` suffix.
pub fn reduce(collection: Expr, reducer: &'static str) -> Expr {
    Expr::call(
        "ImageCollection.reduce",
        [("collection", collection), ("reducer", Expr::invoke(reducer))],
    )
}
