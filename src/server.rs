use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use std::path::Path;

use crate::{
    app::App,
    catalog::Catalog,
    types::{ImdbId, QueryEdit},
    watchlist::KeyValueStore,
};

async fn handle_state<C: Catalog, S: KeyValueStore>(
    req: tide::Request<App<C, S>>,
) -> tide::Result<serde_json::Value> {
    let app = req.state();
    Ok(serde_json::to_value(app.view())?)
}

async fn handle_query<C: Catalog, S: KeyValueStore>(
    mut req: tide::Request<App<C, S>>,
) -> tide::Result<serde_json::Value> {
    let edit: QueryEdit = req.body_json().await?;
    let app = req.state();
    Ok(serde_json::to_value(app.edit(edit))?)
}

#[derive(Debug, Deserialize)]
struct IdRequest {
    id: ImdbId,
}

async fn handle_select<C: Catalog, S: KeyValueStore>(
    mut req: tide::Request<App<C, S>>,
) -> tide::Result<serde_json::Value> {
    let request: IdRequest = req.body_json().await?;
    let app = req.state();
    Ok(serde_json::to_value(app.select(request.id))?)
}

#[derive(Debug, Deserialize)]
struct DetailsQueryParams {
    id: Option<ImdbId>,
}

async fn handle_details<C: Catalog, S: KeyValueStore>(
    req: tide::Request<App<C, S>>,
) -> tide::Result<serde_json::Value> {
    let app = req.state();
    let query: DetailsQueryParams = req.query()?;
    Ok(serde_json::to_value(app.details(query.id)?)?)
}

async fn handle_watchlist<C: Catalog, S: KeyValueStore>(
    req: tide::Request<App<C, S>>,
) -> tide::Result<serde_json::Value> {
    let app = req.state();
    Ok(serde_json::to_value(app.watchlist()?)?)
}

async fn handle_toggle<C: Catalog, S: KeyValueStore>(
    mut req: tide::Request<App<C, S>>,
) -> tide::Result<serde_json::Value> {
    let request: IdRequest = req.body_json().await?;
    let app = req.state();
    Ok(serde_json::to_value(app.toggle_watchlist(request.id)?)?)
}

async fn handle_poster<C: Catalog, S: KeyValueStore>(
    req: tide::Request<App<C, S>>,
) -> tide::Result<tide::Response> {
    let id = ImdbId(req.param("id")?.to_string());
    let app = req.state();
    let content = app.poster(&id)?;
    Ok(poster_response(content))
}

/// Posters come from arbitrary hosts, so the type is read from the image
/// itself. Unknown formats go out as plain bytes.
fn poster_response(content: Vec<u8>) -> tide::Response {
    let mime = tide::http::Mime::sniff(&content).ok();
    let mut response = tide::Response::builder(tide::StatusCode::Ok)
        .body(tide::Body::from_bytes(content))
        .build();
    if let Some(mime) = mime {
        response.set_content_type(mime);
    }
    response
}

#[derive(Error, Debug)]
pub enum ServerCreationError {
    #[error("failed to serve directory")]
    ServeDir(#[source] std::io::Error),
}

pub struct Server<C, S> {
    app: tide::Server<App<C, S>>,
}

impl<C: Catalog, S: KeyValueStore> Server<C, S> {
    pub fn new(
        html_path: Option<&Path>,
        app: App<C, S>,
    ) -> Result<Server<C, S>, ServerCreationError> {
        let mut app = tide::with_state(app);

        if let Some(html_path) = html_path {
            info!("Serving front-end from {}", html_path.display());
            app.at("/").get(tide::Redirect::new("/index.html"));
            app.at("/")
                .serve_dir(html_path)
                .map_err(ServerCreationError::ServeDir)?;
        }

        app.at("/state").get(handle_state::<C, S>);
        app.at("/query").put(handle_query::<C, S>);
        app.at("/select").put(handle_select::<C, S>);
        app.at("/details").get(handle_details::<C, S>);
        app.at("/watchlist").get(handle_watchlist::<C, S>);
        app.at("/watchlist/toggle").put(handle_toggle::<C, S>);
        app.at("/poster/:id").get(handle_poster::<C, S>);

        Ok(Server { app })
    }

    pub async fn serve(self, port: u16) -> std::io::Result<()> {
        self.app.listen(format!("127.0.0.1:{port}")).await
    }
}
