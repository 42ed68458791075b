//! objmap-test: Test domain for conformance testing
//!
//! A small travel domain with one nested object and one nested list:
//!
//! - [`TravelInfo`] — departure date, destinations, a [`TrainInfo`] and [`Person`] travelers
//! - [`TrainInfo`] — name, maximum speed, restaurant flag
//! - [`Person`] — name
//! - [`Session`] — a persistence context that records what was allocated in it
//!
//! This is the reference extension that demonstrates how to make model types
//! mappable.
//!
//! # Example
//!
//! ```
//! use objmap_test::prelude::*;
//! use serde_json::json;
//!
//! let registry = objmap_test::registry();
//! let mapper = Mapper::new(&registry);
//!
//! let source = json!({
//!     "destination": "Berlin",
//!     "trainInfo": { "name": "ICE", "maxSpeed": 300 }
//! });
//! let travel: TravelInfo = mapper.build(source.as_object().unwrap()).unwrap();
//!
//! assert_eq!(travel.destination.as_deref(), Some("Berlin"));
//! assert_eq!(travel.train_info.unwrap().max_speed, Some(300));
//! ```

use std::any::Any;
use std::cell::RefCell;

use chrono::{DateTime, SecondsFormat, Utc};
use objmap::prelude::*;
use serde_json::Value;

#[cfg(feature = "fixtures")]
pub mod fixture;

// ═══════════════════════════════════════════════════════════════════════════════
// Persistence context
// ═══════════════════════════════════════════════════════════════════════════════

/// Persistence context: a named session that records every allocation.
///
/// Models allocated in a session remember the session's name.
#[derive(Debug, Default)]
pub struct Session {
    name: String,
    allocated: RefCell<Vec<&'static str>>,
}

impl Session {
    /// Create an empty session.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            allocated: RefCell::new(Vec::new()),
        }
    }

    /// The session name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type URLs allocated in this session, in allocation order.
    #[must_use]
    pub fn allocated(&self) -> Vec<&'static str> {
        self.allocated.borrow().clone()
    }
}

impl PersistenceContext for Session {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Returns the session name to bind a new instance to.
///
/// Any context other than a [`Session`] is refused.
fn bind(
    type_url: &'static str,
    context: Option<&dyn PersistenceContext>,
) -> Result<Option<String>, MappingError> {
    let Some(context) = context else {
        return Ok(None);
    };
    let session = context
        .as_any()
        .downcast_ref::<Session>()
        .ok_or_else(|| MappingError::Allocation {
            type_url: type_url.to_owned(),
            reason: format!("{context:?} is not a Session"),
        })?;
    session.allocated.borrow_mut().push(type_url);
    Ok(Some(session.name.clone()))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Models
// ═══════════════════════════════════════════════════════════════════════════════

/// A traveler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Person {
    /// Display name.
    pub name: Option<String>,
    /// Session this instance was allocated in.
    pub session: Option<String>,
}

const PERSON_PROPERTIES: &[PropertyDescriptor] =
    &[PropertyDescriptor::new("name", PropertyType::String)];

impl Mappable for Person {
    fn type_url(&self) -> &'static str {
        Self::TYPE_URL
    }

    fn properties(&self) -> &'static [PropertyDescriptor] {
        PERSON_PROPERTIES
    }

    fn property(&self, key: &str) -> Option<Value> {
        match key {
            "name" => self.name.clone().map(Value::String),
            _ => None,
        }
    }

    fn set_property(&mut self, key: &str, value: MappedValue) -> Result<(), AssignError> {
        match key {
            "name" => self.name = Some(value.decode(key)?),
            _ => return Err(AssignError::unknown(key)),
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl MapTarget for Person {
    const TYPE_URL: &'static str = "objmap.test.v1.Person";
    const PROPERTIES: &'static [PropertyDescriptor] = PERSON_PROPERTIES;

    fn allocate(context: Option<&dyn PersistenceContext>) -> Result<Self, MappingError> {
        Ok(Self {
            session: bind(Self::TYPE_URL, context)?,
            ..Self::default()
        })
    }
}

/// The train of a journey.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainInfo {
    /// Train name, e.g. `"ICE 1537"`.
    pub name: Option<String>,
    /// Maximum speed in km/h.
    pub max_speed: Option<u32>,
    /// Whether the train has a restaurant car.
    pub has_restaurant: Option<bool>,
    /// Session this instance was allocated in.
    pub session: Option<String>,
}

const TRAIN_INFO_PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::new("name", PropertyType::String),
    PropertyDescriptor::new("maxSpeed", PropertyType::Integer),
    PropertyDescriptor::new("hasRestaurant", PropertyType::Bool),
];

impl Mappable for TrainInfo {
    fn type_url(&self) -> &'static str {
        Self::TYPE_URL
    }

    fn properties(&self) -> &'static [PropertyDescriptor] {
        TRAIN_INFO_PROPERTIES
    }

    fn property(&self, key: &str) -> Option<Value> {
        match key {
            "name" => self.name.clone().map(Value::String),
            "maxSpeed" => self.max_speed.map(Value::from),
            "hasRestaurant" => self.has_restaurant.map(Value::Bool),
            _ => None,
        }
    }

    fn set_property(&mut self, key: &str, value: MappedValue) -> Result<(), AssignError> {
        match key {
            "name" => self.name = Some(value.decode(key)?),
            "maxSpeed" => self.max_speed = Some(value.decode(key)?),
            "hasRestaurant" => self.has_restaurant = Some(value.decode(key)?),
            _ => return Err(AssignError::unknown(key)),
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl MapTarget for TrainInfo {
    const TYPE_URL: &'static str = "objmap.test.v1.TrainInfo";
    const PROPERTIES: &'static [PropertyDescriptor] = TRAIN_INFO_PROPERTIES;

    fn allocate(context: Option<&dyn PersistenceContext>) -> Result<Self, MappingError> {
        Ok(Self {
            session: bind(Self::TYPE_URL, context)?,
            ..Self::default()
        })
    }
}

/// One journey.
///
/// Its own configuration maps `trainInfo` to a [`TrainInfo`] and `travelers`
/// to a list of [`Person`]; everything else maps by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TravelInfo {
    /// Departure time. Accepts RFC 3339 strings or Unix timestamps (seconds).
    pub date_departure: Option<DateTime<Utc>>,
    /// Where the journey ends.
    pub destination: Option<String>,
    /// Where the journey starts.
    pub departing_destination: Option<String>,
    /// The train.
    pub train_info: Option<TrainInfo>,
    /// Everyone on the journey, in payload order.
    pub travelers: Option<Vec<Person>>,
    /// Session this instance was allocated in.
    pub session: Option<String>,
}

const TRAVEL_INFO_PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::new("dateDeparture", PropertyType::Date),
    PropertyDescriptor::new("destination", PropertyType::String),
    PropertyDescriptor::new("departingDestination", PropertyType::String),
    PropertyDescriptor::new("trainInfo", PropertyType::Object(TrainInfo::TYPE_URL)),
    PropertyDescriptor::new("travelers", PropertyType::Objects(Person::TYPE_URL)),
];

impl Mappable for TravelInfo {
    fn type_url(&self) -> &'static str {
        Self::TYPE_URL
    }

    fn properties(&self) -> &'static [PropertyDescriptor] {
        TRAVEL_INFO_PROPERTIES
    }

    fn property(&self, key: &str) -> Option<Value> {
        match key {
            "dateDeparture" => self
                .date_departure
                .map(|d| Value::String(d.to_rfc3339_opts(SecondsFormat::Secs, true))),
            "destination" => self.destination.clone().map(Value::String),
            "departingDestination" => self.departing_destination.clone().map(Value::String),
            "trainInfo" => self.train_info.as_ref().map(Mappable::snapshot),
            "travelers" => self
                .travelers
                .as_ref()
                .map(|people| people.iter().map(Mappable::snapshot).collect()),
            _ => None,
        }
    }

    fn set_property(&mut self, key: &str, value: MappedValue) -> Result<(), AssignError> {
        match key {
            "dateDeparture" => self.date_departure = Some(decode_date(key, value)?),
            "destination" => self.destination = Some(value.decode(key)?),
            "departingDestination" => self.departing_destination = Some(value.decode(key)?),
            "trainInfo" => self.train_info = Some(value.into_object(key)?),
            "travelers" => self.travelers = Some(value.into_objects(key)?),
            _ => return Err(AssignError::unknown(key)),
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl MapTarget for TravelInfo {
    const TYPE_URL: &'static str = "objmap.test.v1.TravelInfo";
    const PROPERTIES: &'static [PropertyDescriptor] = TRAVEL_INFO_PROPERTIES;

    fn allocate(context: Option<&dyn PersistenceContext>) -> Result<Self, MappingError> {
        Ok(Self {
            session: bind(Self::TYPE_URL, context)?,
            ..Self::default()
        })
    }

    fn mapping_configuration() -> MappingConfiguration {
        let mut config = MappingConfiguration::new();
        config.set_nested_type_rule("trainInfo", "trainInfo", TrainInfo::TYPE_URL);
        config.set_nested_type_rule("travelers", "travelers", Person::TYPE_URL);
        config
    }
}

fn decode_date(key: &str, value: MappedValue) -> Result<DateTime<Utc>, AssignError> {
    if let Some(Value::Number(n)) = value.as_value() {
        return n
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or_else(|| AssignError::incompatible(key, format!("{n} is not a Unix timestamp")));
    }
    value.decode(key)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Registration
// ═══════════════════════════════════════════════════════════════════════════════

/// Register all objmap-test types with the given builder.
///
/// Registers the core transforms and the test-domain models:
/// - `objmap.test.v1.TravelInfo` → [`TravelInfo`]
/// - `objmap.test.v1.TrainInfo` → [`TrainInfo`]
/// - `objmap.test.v1.Person` → [`Person`]
#[must_use]
pub fn register(builder: TypeRegistryBuilder) -> TypeRegistryBuilder {
    objmap::register_core_transforms(builder)
        .model::<TravelInfo>()
        .model::<TrainInfo>()
        .model::<Person>()
}

/// A registry with everything [`register`] adds.
#[must_use]
pub fn registry() -> TypeRegistry {
    register(TypeRegistryBuilder::new()).build()
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{Person, Session, TrainInfo, TravelInfo};
    pub use objmap::prelude::*;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn map(value: Value) -> SourceMap {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn register_adds_models_and_transforms() {
        let registry = registry();
        assert_eq!(
            registry.type_urls(),
            [
                "objmap.test.v1.Person",
                "objmap.test.v1.TrainInfo",
                "objmap.test.v1.TravelInfo",
            ]
        );
        assert_eq!(registry.transform_count(), 4);
    }

    #[test]
    fn date_from_rfc3339_and_timestamp() {
        let expected = Utc.with_ymd_and_hms(2015, 4, 5, 10, 0, 0).unwrap();

        let mut travel = TravelInfo::default();
        travel
            .set_property("dateDeparture", json!("2015-04-05T10:00:00Z").into())
            .unwrap();
        assert_eq!(travel.date_departure, Some(expected));

        travel
            .set_property("dateDeparture", json!(1_428_228_000).into())
            .unwrap();
        assert_eq!(travel.date_departure, Some(expected));
        assert_eq!(travel.property("dateDeparture"), Some(json!("2015-04-05T10:00:00Z")));
    }

    #[test]
    fn date_rejects_garbage() {
        let mut travel = TravelInfo::default();
        assert!(travel
            .set_property("dateDeparture", json!("next tuesday").into())
            .is_err());
        assert!(travel
            .set_property("dateDeparture", json!(1.5).into())
            .is_err());
        assert!(travel.date_departure.is_none());
    }

    #[test]
    fn session_records_allocations() {
        let registry = registry();
        let session = Session::new("s1");
        let travel: TravelInfo = Mapper::new(&registry)
            .build_in_context(
                &map(json!({
                    "trainInfo": { "name": "ICE" },
                    "travelers": [{ "name": "A" }, { "name": "B" }]
                })),
                &session,
            )
            .unwrap();

        assert_eq!(travel.session.as_deref(), Some("s1"));
        assert_eq!(travel.train_info.unwrap().session.as_deref(), Some("s1"));
        assert_eq!(
            session.allocated(),
            [
                "objmap.test.v1.TravelInfo",
                "objmap.test.v1.TrainInfo",
                "objmap.test.v1.Person",
                "objmap.test.v1.Person",
            ]
        );
    }

    #[test]
    fn foreign_context_is_refused() {
        #[derive(Debug)]
        struct Elsewhere;
        impl PersistenceContext for Elsewhere {
            fn as_any(&self) -> &dyn Any {
                self
            }
        }

        let err = TravelInfo::allocate(Some(&Elsewhere)).unwrap_err();
        assert!(err.to_string().contains("Elsewhere is not a Session"));
    }

    #[test]
    fn snapshot_round_trips_nested() {
        let registry = registry();
        let source = json!({
            "destination": "Berlin",
            "trainInfo": { "name": "ICE", "maxSpeed": 300, "hasRestaurant": true },
            "travelers": [{ "name": "A" }]
        });
        let travel: TravelInfo = Mapper::new(&registry).build(&map(source.clone())).unwrap();
        assert_eq!(travel.snapshot(), source);
    }
}
