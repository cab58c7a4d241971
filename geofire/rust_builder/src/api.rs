//! API bridging layer that exposes the geofire plugin to Flutter.
//!
//! Flutter forwards every method-channel call as a method name plus a JSON
//! argument map and gets back a JSON [`MethodResponse`]. Device location
//! fixes are pushed in from the platform side through the `report_*`
//! methods.

use std::path::Path;
use std::sync::Arc;

use flutter_rust_bridge::frb;
use geofire_core::channel::{MethodCall, MethodResponse, CHANNEL_NAME};
use geofire_core::provider::WatchLocationProvider;
use geofire_core::store::SqliteGeoStore;
use geofire_core::{GeofireConfig, GeofireError, GeofirePlugin};
use log::{error, info};
use serde_json::Value;
use tokio::runtime::Runtime;

/// Geofire plugin instance owned by the Flutter side.
#[derive(Debug)]
#[frb(opaque)]
pub struct GeofireBridge {
    plugin: GeofirePlugin<WatchLocationProvider>,
    provider: Arc<WatchLocationProvider>,
    runtime: Runtime,
}

impl GeofireBridge {
    /// Opens the location database at `db_path` and starts a session.
    ///
    /// `config_json` overrides the defaults of [`GeofireConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid, the runtime cannot start,
    /// or the database cannot be opened.
    pub fn new(db_path: String, config_json: Option<String>) -> Result<Self, String> {
        let config = match config_json {
            Some(json) => GeofireConfig::from_json(&json).map_err(|e| e.to_string())?,
            None => GeofireConfig::default(),
        };

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| format!("Failed to start runtime: {e}"))?;
        let store = SqliteGeoStore::new(Path::new(&db_path)).map_err(|e| e.to_string())?;
        let store = Arc::new(store);
        let provider = Arc::new(WatchLocationProvider::new(config.location_wait()));

        let plugin = {
            let _guard = runtime.enter();
            GeofirePlugin::new(store, Arc::clone(&provider), &config)
        };
        info!("geofire bridge ready on {CHANNEL_NAME} with store at {db_path}");

        Ok(Self {
            plugin,
            provider,
            runtime,
        })
    }

    /// Returns the method-channel name the Flutter side should register.
    #[frb(sync)]
    #[must_use]
    pub fn channel_name() -> String {
        CHANNEL_NAME.to_string()
    }

    /// Handles one method-channel call and returns the JSON response.
    ///
    /// `arguments_json` may be empty for calls without arguments.
    #[must_use]
    pub fn handle_method_call(&self, method: String, arguments_json: String) -> String {
        let response = match parse_arguments(&arguments_json) {
            Ok(arguments) => {
                let call = MethodCall::new(method, arguments);
                self.runtime.block_on(self.plugin.handle(&call))
            }
            Err(e) => e.into(),
        };
        encode(&response)
    }

    /// Records a new device fix.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinate is out of range.
    #[frb(sync)]
    pub fn report_location(&self, latitude: f64, longitude: f64) -> Result<(), String> {
        self.provider
            .report(latitude, longitude)
            .map_err(|e| e.to_string())
    }

    /// Records that no fix is available (e.g. permission denied).
    #[frb(sync)]
    pub fn report_location_unavailable(&self) {
        self.provider.report_unavailable();
    }

    /// Records a platform location service failure.
    #[frb(sync)]
    pub fn report_location_error(&self, message: String) {
        self.provider.report_failure(&message);
    }

    /// Stops any active query and ends the session.
    pub fn dispose(&self) {
        self.runtime.block_on(self.plugin.detach());
    }
}

fn parse_arguments(json: &str) -> Result<Value, GeofireError> {
    if json.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(json)
        .map_err(|e| GeofireError::InvalidArguments(format!("Malformed arguments: {e}")))
}

fn encode(response: &MethodResponse) -> String {
    response.to_json().unwrap_or_else(|e| {
        error!("failed to encode method response: {e}");
        r#"{"status":"error","code":"ERROR","message":"Failed to encode response","details":null}"#
            .to_string()
    })
}
