//! REST side of the authority.

use axum::{
    Json,
    extract::{Path, State},
};
use http::{HeaderName, header};
use overlay_proto::{MetricsSnapshot, PresetList, SceneDocument, SceneWrite, WriteAck};

use super::AppState;
use crate::{config::ServerConfig, error::AuthorityError};

type NoStore<T> = ([(HeaderName, &'static str); 1], Json<T>);

fn no_store<T>(body: T) -> NoStore<T> {
    ([(header::CACHE_CONTROL, "no-store")], Json(body))
}

pub async fn get_scene(State(state): State<AppState>) -> NoStore<SceneDocument> {
    no_store(state.authority.document())
}

pub async fn put_scene(
    State(state): State<AppState>,
    Json(write): Json<SceneWrite>,
) -> Json<WriteAck> {
    let items = write.items.len();
    let ack = state.authority.write_scene(write);
    tracing::info!(version = ack.version, items, "Scene written");
    Json(ack)
}

pub async fn list_presets(State(state): State<AppState>) -> Json<PresetList> {
    Json(PresetList {
        presets: state.authority.preset_names(),
    })
}

pub async fn get_preset(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<SceneDocument>, AuthorityError> {
    state.authority.preset(&name).map(Json)
}

pub async fn realtime_metrics(State(state): State<AppState>) -> NoStore<MetricsSnapshot> {
    no_store(state.authority.metrics())
}

pub async fn get_config(State(state): State<AppState>) -> Json<ServerConfig> {
    Json(state.config.as_ref().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_proto::{ClientCommand, Layer, LayerKind, WriteMeta};

    fn state() -> AppState {
        AppState::new(ServerConfig::default())
    }

    #[tokio::test]
    async fn test_put_then_get_scene() {
        let state = state();
        let write = SceneWrite {
            items: vec![Layer::new("a", LayerKind::Text, "hi")],
            meta: WriteMeta {
                source: Some("moderator-panel".into()),
                client_ts: 1,
                known_version: 0,
            },
        };

        let Json(ack) = put_scene(State(state.clone()), Json(write)).await;
        assert_eq!(ack.version, 1);

        let (headers, Json(doc)) = get_scene(State(state)).await;
        assert_eq!(headers[0].1, "no-store");
        assert_eq!(doc.version, 1);
        assert_eq!(doc.items[0].content, "hi");
    }

    #[tokio::test]
    async fn test_presets_listing_and_lookup() {
        let state = state();
        state
            .authority
            .handle_command(ClientCommand::PresetSave {
                name: "outro".into(),
            })
            .unwrap();

        let Json(list) = list_presets(State(state.clone())).await;
        assert_eq!(list.presets, vec!["outro".to_string()]);

        assert!(
            get_preset(State(state.clone()), Path("outro".into()))
                .await
                .is_ok()
        );
        let err = get_preset(State(state), Path("missing".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthorityError::PresetNotFound(_)));
    }

    #[tokio::test]
    async fn test_config_and_metrics() {
        let state = state();
        let Json(config) = get_config(State(state.clone())).await;
        assert_eq!(config, ServerConfig::default());

        let (_, Json(metrics)) = realtime_metrics(State(state)).await;
        assert_eq!(metrics.scene_version, 0);
        assert_eq!(metrics.ws_broadcasts, 0);
    }
}
