//! Plugin entry point: dispatches method-channel calls to the session.

use std::sync::Arc;

use log::debug;
use serde_json::{json, Value};

use crate::channel::{Arguments, MethodCall, MethodResponse};
use crate::config::GeofireConfig;
use crate::error::Result;
use crate::location::Coordinate;
use crate::provider::LocationProvider;
use crate::session::GeofireSession;
use crate::store::GeoStore;

const MISSING_ARGUMENTS: &str = "Missing or invalid arguments";
const MISSING_NODE: &str = "Node parameter is missing or invalid";
const MISSING_USER_ID: &str = "User ID is missing or invalid";

/// Core interface for the geofire plugin.
///
/// Owns one [`GeofireSession`] and answers every [`MethodCall`] with exactly
/// one [`MethodResponse`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use geofire_core::channel::MethodCall;
/// use geofire_core::provider::FixedLocationProvider;
/// use geofire_core::store::MemoryGeoStore;
/// use geofire_core::{GeofireConfig, GeofirePlugin};
/// use serde_json::json;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let plugin = GeofirePlugin::new(
///     Arc::new(MemoryGeoStore::new()),
///     Arc::new(FixedLocationProvider::unavailable()),
///     &GeofireConfig::default(),
/// );
///
/// let response = plugin
///     .handle(&MethodCall::new("initialize", json!({"node": "locations"})))
///     .await;
/// assert_eq!(response.result(), Some(&json!(true)));
/// # });
/// ```
#[derive(Debug)]
pub struct GeofirePlugin<P> {
    session: GeofireSession<P>,
}

impl<P: LocationProvider> GeofirePlugin<P> {
    /// Creates a plugin backed by `store` and `provider`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn new<S: GeoStore>(store: Arc<S>, provider: Arc<P>, config: &GeofireConfig) -> Self {
        Self {
            session: GeofireSession::spawn(store, provider, config),
        }
    }

    /// Returns the underlying session handle.
    #[must_use]
    pub const fn session(&self) -> &GeofireSession<P> {
        &self.session
    }

    /// Handles one method call.
    pub async fn handle(&self, call: &MethodCall) -> MethodResponse {
        debug!("method call: {}", call.method);
        let args = Arguments::new(&call.arguments);
        let result = match call.method.as_str() {
            "initialize" => self.initialize(args).await,
            "getCurrentLocation" => self.get_current_location().await,
            "saveLocation" => self.write_location(args).await.map(|()| Value::Null),
            "setLocation" => self.write_location(args).await.map(|()| json!(true)),
            "removeLocation" => self.remove_location(args).await,
            "queryLocations" => self.query_locations(args).await,
            "stopListener" => {
                self.session.stop_listener().await;
                Ok(json!(true))
            }
            _ => return MethodResponse::NotImplemented,
        };
        result.into()
    }

    /// Stops any active query and ends the session.
    pub async fn detach(&self) {
        self.session.shutdown().await;
    }

    async fn initialize(&self, args: Arguments<'_>) -> Result<Value> {
        let node = args.require_string("node", MISSING_NODE)?;
        self.session.initialize(node).await?;
        Ok(json!(true))
    }

    async fn get_current_location(&self) -> Result<Value> {
        let location = self.session.get_current_location().await?;
        Ok(json!({
            "latitude": location.latitude,
            "longitude": location.longitude,
        }))
    }

    async fn write_location(&self, args: Arguments<'_>) -> Result<()> {
        let user_id = args.require_string("userId", MISSING_ARGUMENTS)?;
        let coordinate = Self::coordinate(args)?;
        self.session.set_location(user_id, coordinate).await
    }

    async fn remove_location(&self, args: Arguments<'_>) -> Result<Value> {
        let user_id = args.require_string("userId", MISSING_USER_ID)?;
        self.session.remove_location(user_id).await?;
        Ok(json!(true))
    }

    async fn query_locations(&self, args: Arguments<'_>) -> Result<Value> {
        let (center, radius_km) = match Self::query_args(args) {
            Ok(query) => query,
            Err(e) => {
                self.session.stop_listener().await;
                return Err(e);
            }
        };
        // Range checks happen in the session, after the active query stops.
        let hits = self.session.query_locations(center, radius_km).await?;
        Ok(json!(hits))
    }

    fn query_args(args: Arguments<'_>) -> Result<(Coordinate, f64)> {
        let center = Coordinate {
            latitude: args.require_number("latitude", MISSING_ARGUMENTS)?,
            longitude: args.require_number("longitude", MISSING_ARGUMENTS)?,
        };
        let radius_km = args.require_number("radiusInKm", MISSING_ARGUMENTS)?;
        Ok((center, radius_km))
    }

    fn coordinate(args: Arguments<'_>) -> Result<Coordinate> {
        let latitude = args.require_number("latitude", MISSING_ARGUMENTS)?;
        let longitude = args.require_number("longitude", MISSING_ARGUMENTS)?;
        Coordinate::new(latitude, longitude)
    }
}
