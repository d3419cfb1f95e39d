//! Helpers for observing crowd sync errors in tests.
use bevy_app::App;
use bevy_ecs::prelude::*;
use crowd_bridge::CrowdSyncError;

/// Collected crowd sync errors captured during tests.
/// Stored as `(context, detail)` strings to avoid cross-crate type mismatches.
#[derive(Resource, Default, Debug)]
pub struct CapturedErrors(pub Vec<(String, String)>);

#[expect(
    clippy::needless_pass_by_value,
    reason = "Observer systems must take On<T> by value."
)]
fn record_error(event: On<CrowdSyncError>, mut errors: ResMut<CapturedErrors>) {
    let err = event.event();
    errors
        .0
        .push((format!("{:?}", err.context), err.detail.clone()));
}

/// Installs the error-capturing observer and resource on the provided app.
pub fn install_error_observer(app: &mut App) {
    app.insert_resource(CapturedErrors::default());
    app.world_mut().add_observer(record_error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crowd_bridge::CrowdSyncErrorContext;

    #[test]
    fn observer_records_triggered_error() {
        let mut app = App::new();
        install_error_observer(&mut app);
        app.world_mut()
            .trigger(CrowdSyncError::new(CrowdSyncErrorContext::Push, "probe"));
        assert_eq!(
            app.world().resource::<CapturedErrors>().0,
            [("Push".to_owned(), "probe".to_owned())]
        );
    }
}
