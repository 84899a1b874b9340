// ============================================================
// Layer 3 — FeatureRecord
// ============================================================
// One student's attributes: the single input of the model.
//
// A FeatureRecord only exists in validated form. It is built from
// any `FieldSource` (a JSON object from a request body, a CSV row
// from the dataset) by `FeatureRecord::from_source`, which checks
// every field and reports ALL offending fields at once.
//
// Column order matters downstream: the fitted preprocessor is
// positional, so `numeric_values()` and `categorical_values()`
// always emit columns in the canonical order below, whatever order
// the keys arrived in.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::domain::category::{
    Address, Categorical, FamilySize, Guardian, Job, ParentStatus, Reason, School, Sex,
};
use crate::domain::error::{FieldError, FieldErrorKind, ValidationError};

/// Every field of the schema, in dataset column order.
pub const FIELD_NAMES: [&str; 32] = [
    "school", "sex", "age", "address", "famsize", "Pstatus", "Medu", "Fedu",
    "Mjob", "Fjob", "reason", "guardian", "traveltime", "studytime", "failures",
    "schoolsup", "famsup", "paid", "activities", "nursery", "higher", "internet",
    "romantic", "famrel", "freetime", "goout", "Dalc", "Walc", "health",
    "absences", "G1", "G2",
];

/// Numeric columns in the order the preprocessor was fitted with.
pub const NUMERIC_COLUMNS: [&str; 23] = [
    "age", "Medu", "Fedu", "traveltime", "studytime", "failures",
    "schoolsup", "famsup", "paid", "activities", "nursery", "higher",
    "internet", "romantic", "famrel", "freetime", "goout", "Dalc", "Walc",
    "health", "absences", "G1", "G2",
];

/// Categorical columns in the order the preprocessor was fitted with.
pub const CATEGORICAL_COLUMNS: [&str; 9] = [
    "school", "sex", "address", "famsize", "Pstatus", "Mjob", "Fjob", "reason", "guardian",
];

const FLAG_LABELS: [&str; 2] = ["yes", "no"];

// ─── Field sources ────────────────────────────────────────────────────────────

/// A single raw field value before validation.
#[derive(Debug, Clone, Copy)]
pub enum RawValue<'a> {
    /// From a JSON request body: types are significant.
    Json(&'a Value),
    /// From a delimited text file: everything is a string.
    Text(&'a str),
}

impl<'a> RawValue<'a> {
    fn as_text(&self) -> Option<&'a str> {
        match *self {
            RawValue::Json(Value::String(s)) => Some(s.as_str()),
            RawValue::Json(_)                => None,
            RawValue::Text(s)                => Some(s.trim()),
        }
    }

    fn as_integer(&self) -> Option<i64> {
        match *self {
            RawValue::Json(Value::Number(n)) => n.as_i64().or_else(|| {
                // 4.0 is still the integer 4; 4.5 is not
                n.as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
            }),
            RawValue::Json(_)  => None,
            RawValue::Text(s)  => s.trim().parse().ok(),
        }
    }
}

/// Anything a FeatureRecord can be read from.
pub trait FieldSource {
    fn get(&self, field: &str) -> Option<RawValue<'_>>;

    /// Keys the source carries that the schema does not know about.
    fn unexpected_fields(&self) -> Vec<String> {
        Vec::new()
    }
}

impl FieldSource for Map<String, Value> {
    fn get(&self, field: &str) -> Option<RawValue<'_>> {
        Map::get(self, field).map(RawValue::Json)
    }

    fn unexpected_fields(&self) -> Vec<String> {
        self.keys()
            .filter(|k| !FIELD_NAMES.contains(&k.as_str()))
            .cloned()
            .collect()
    }
}

// ─── FieldReader ──────────────────────────────────────────────────────────────
// Reads typed fields out of a source, collecting every failure
// instead of stopping at the first one. A failed read returns a
// placeholder value; the caller discards the record if any
// error was collected.
struct FieldReader<'s, S: FieldSource + ?Sized> {
    source: &'s S,
    errors: Vec<FieldError>,
}

impl<'s, S: FieldSource + ?Sized> FieldReader<'s, S> {
    fn new(source: &'s S) -> Self {
        Self { source, errors: Vec::new() }
    }

    fn fail(&mut self, field: &str, kind: FieldErrorKind) {
        self.errors.push(FieldError::new(field, kind));
    }

    fn category<C: Categorical>(&mut self, field: &str) -> C {
        let Some(raw) = self.source.get(field) else {
            self.fail(field, FieldErrorKind::Missing);
            return C::placeholder();
        };
        match raw.as_text() {
            Some(text) => match C::parse(text) {
                Some(value) => return value,
                None => self.fail(field, FieldErrorKind::UnknownCategory {
                    value:   text.to_string(),
                    allowed: C::LABELS.iter().map(|l| l.to_string()).collect(),
                }),
            },
            None => self.fail(field, FieldErrorKind::WrongType { expected: "string" }),
        }
        C::placeholder()
    }

    fn integer(&mut self, field: &str, min: u8, max: u8) -> u8 {
        let Some(raw) = self.source.get(field) else {
            self.fail(field, FieldErrorKind::Missing);
            return min;
        };
        match raw.as_integer() {
            Some(v) if (i64::from(min)..=i64::from(max)).contains(&v) => v as u8,
            Some(v) => {
                self.fail(field, FieldErrorKind::OutOfRange {
                    value: v,
                    min:   i64::from(min),
                    max:   i64::from(max),
                });
                min
            }
            None => {
                self.fail(field, FieldErrorKind::WrongType { expected: "integer" });
                min
            }
        }
    }

    /// Binary columns: 0/1, or the dataset's "yes"/"no". Anything
    /// else is rejected rather than passed through to the model.
    fn flag(&mut self, field: &str) -> bool {
        let Some(raw) = self.source.get(field) else {
            self.fail(field, FieldErrorKind::Missing);
            return false;
        };
        match raw.as_text() {
            Some("yes") => return true,
            Some("no")  => return false,
            _ => {}
        }
        match raw.as_integer() {
            Some(1) => true,
            Some(0) => false,
            Some(v) => {
                self.fail(field, FieldErrorKind::OutOfRange { value: v, min: 0, max: 1 });
                false
            }
            None => {
                let kind = match raw.as_text() {
                    Some(text) => FieldErrorKind::UnknownCategory {
                        value:   text.to_string(),
                        allowed: FLAG_LABELS.iter().map(|l| l.to_string()).collect(),
                    },
                    None => FieldErrorKind::WrongType { expected: "0, 1, \"yes\" or \"no\"" },
                };
                self.fail(field, kind);
                false
            }
        }
    }
}

// ─── FeatureRecord ────────────────────────────────────────────────────────────

/// A fully validated student record. Serializes to the same JSON
/// shape the HTTP endpoint accepts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRecord {
    pub school:  School,
    pub sex:     Sex,
    pub age:     u8,
    pub address: Address,
    pub famsize: FamilySize,
    #[serde(rename = "Pstatus")]
    pub pstatus: ParentStatus,
    #[serde(rename = "Medu")]
    pub medu:    u8,
    #[serde(rename = "Fedu")]
    pub fedu:    u8,
    #[serde(rename = "Mjob")]
    pub mjob:    Job,
    #[serde(rename = "Fjob")]
    pub fjob:    Job,
    pub reason:     Reason,
    pub guardian:   Guardian,
    pub traveltime: u8,
    pub studytime:  u8,
    pub failures:   u8,
    #[serde(serialize_with = "serialize_flag")]
    pub schoolsup:  bool,
    #[serde(serialize_with = "serialize_flag")]
    pub famsup:     bool,
    #[serde(serialize_with = "serialize_flag")]
    pub paid:       bool,
    #[serde(serialize_with = "serialize_flag")]
    pub activities: bool,
    #[serde(serialize_with = "serialize_flag")]
    pub nursery:    bool,
    #[serde(serialize_with = "serialize_flag")]
    pub higher:     bool,
    #[serde(serialize_with = "serialize_flag")]
    pub internet:   bool,
    #[serde(serialize_with = "serialize_flag")]
    pub romantic:   bool,
    pub famrel:   u8,
    pub freetime: u8,
    pub goout:    u8,
    #[serde(rename = "Dalc")]
    pub dalc:     u8,
    #[serde(rename = "Walc")]
    pub walc:     u8,
    pub health:   u8,
    pub absences: u8,
    #[serde(rename = "G1")]
    pub g1:       u8,
    #[serde(rename = "G2")]
    pub g2:       u8,
}

fn serialize_flag<S: Serializer>(flag: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*flag))
}

impl FeatureRecord {
    /// Validate a source into a record. Every field must be present and
    /// valid, and the source must not carry fields outside the schema.
    pub fn from_source<S: FieldSource + ?Sized>(source: &S) -> Result<Self, ValidationError> {
        let mut r = FieldReader::new(source);

        let record = FeatureRecord {
            school:     r.category("school"),
            sex:        r.category("sex"),
            age:        r.integer("age", 15, 22),
            address:    r.category("address"),
            famsize:    r.category("famsize"),
            pstatus:    r.category("Pstatus"),
            medu:       r.integer("Medu", 0, 4),
            fedu:       r.integer("Fedu", 0, 4),
            mjob:       r.category("Mjob"),
            fjob:       r.category("Fjob"),
            reason:     r.category("reason"),
            guardian:   r.category("guardian"),
            traveltime: r.integer("traveltime", 1, 4),
            studytime:  r.integer("studytime", 1, 4),
            failures:   r.integer("failures", 0, 4),
            schoolsup:  r.flag("schoolsup"),
            famsup:     r.flag("famsup"),
            paid:       r.flag("paid"),
            activities: r.flag("activities"),
            nursery:    r.flag("nursery"),
            higher:     r.flag("higher"),
            internet:   r.flag("internet"),
            romantic:   r.flag("romantic"),
            famrel:     r.integer("famrel", 1, 5),
            freetime:   r.integer("freetime", 1, 5),
            goout:      r.integer("goout", 1, 5),
            dalc:       r.integer("Dalc", 1, 5),
            walc:       r.integer("Walc", 1, 5),
            health:     r.integer("health", 1, 5),
            absences:   r.integer("absences", 0, 93),
            g1:         r.integer("G1", 0, 20),
            g2:         r.integer("G2", 0, 20),
        };

        for extra in source.unexpected_fields() {
            r.fail(&extra, FieldErrorKind::Unexpected);
        }

        if r.errors.is_empty() {
            Ok(record)
        } else {
            Err(ValidationError::new(r.errors))
        }
    }

    /// Validate a JSON object, e.g. a request body.
    pub fn from_json(object: &Map<String, Value>) -> Result<Self, ValidationError> {
        Self::from_source(object)
    }

    /// Numeric features in `NUMERIC_COLUMNS` order, flags as 0/1.
    pub fn numeric_values(&self) -> [f64; 23] {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        [
            f64::from(self.age),
            f64::from(self.medu),
            f64::from(self.fedu),
            f64::from(self.traveltime),
            f64::from(self.studytime),
            f64::from(self.failures),
            flag(self.schoolsup),
            flag(self.famsup),
            flag(self.paid),
            flag(self.activities),
            flag(self.nursery),
            flag(self.higher),
            flag(self.internet),
            flag(self.romantic),
            f64::from(self.famrel),
            f64::from(self.freetime),
            f64::from(self.goout),
            f64::from(self.dalc),
            f64::from(self.walc),
            f64::from(self.health),
            f64::from(self.absences),
            f64::from(self.g1),
            f64::from(self.g2),
        ]
    }

    /// Categorical features in `CATEGORICAL_COLUMNS` order.
    pub fn categorical_values(&self) -> [&'static str; 9] {
        [
            self.school.as_str(),
            self.sex.as_str(),
            self.address.as_str(),
            self.famsize.as_str(),
            self.pstatus.as_str(),
            self.mjob.as_str(),
            self.fjob.as_str(),
            self.reason.as_str(),
            self.guardian.as_str(),
        ]
    }
}
