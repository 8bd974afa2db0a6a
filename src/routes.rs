use std::{convert::Infallible, sync::Arc};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use warp::{
    filters::body::BodyDeserializeError,
    http::StatusCode,
    reject::{InvalidQuery, LengthRequired, MethodNotAllowed, PayloadTooLarge, UnsupportedMediaType},
    reply::{self, Response},
    Filter, Rejection, Reply,
};

use crate::{
    actions::{
        add_relation, build_shopping_list, create_recipe, delete_recipe, fetch_recipes,
        fetch_subscriptions, get_ingredient, get_recipe_detail, get_tag,
        get_user_profile, list_ingredients, list_tags, remove_relation, render_shopping_list,
        subscribe, unsubscribe, update_recipe,
    },
    constants::{MAX_BODY_SIZE, SHOPPING_LIST_FILENAME},
    error::ServiceError,
    form::{Form, FormData, PageRequest, RecipeFilter},
    jwt::SessionData,
    middleware::{with_possible_session, with_session, Unauthorized},
    permissions::ActionType,
    schema::{RelationKind, Uuid},
    state::State,
    validation::RecipeForm,
};

/// Every endpoint of the service with rejections rendered as JSON errors.
pub fn routes(state: Arc<State>) -> impl Filter<Extract = (Response,), Error = Infallible> + Clone {
    recipe_routes(state.clone())
        .or(relation_routes(RelationKind::Favorite, "favorite", state.clone()))
        .unify()
        .or(relation_routes(RelationKind::ShoppingCart, "shopping_cart", state.clone()))
        .unify()
        .or(user_routes(state.clone()))
        .unify()
        .or(catalog_routes(state))
        .unify()
        .recover(handle_rejection)
        .unify()
}

fn with_state(
    state: Arc<State>,
) -> impl Filter<Extract = (Arc<State>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_SIZE).and(warp::body::json())
}

fn respond<T: Serialize>(result: Result<T, ServiceError>, status: StatusCode) -> Response {
    match result {
        Ok(value) => reply::with_status(reply::json(&value), status).into_response(),
        Err(e) => e.into_response(),
    }
}

fn respond_empty(result: Result<(), ServiceError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

fn recipe_routes(
    state: Arc<State>,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    let secret = state.secret.clone();

    let list = warp::path!("api" / "recipes")
        .and(warp::get())
        .and(warp::query::<FormData>())
        .and(with_possible_session(secret.clone()))
        .and(with_state(state.clone()))
        .and_then(list_recipes);

    let create = warp::path!("api" / "recipes")
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(json_body::<RecipeForm>())
        .and(with_state(state.clone()))
        .and_then(post_recipe);

    let download = warp::path!("api" / "recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(secret.clone()))
        .and(with_state(state.clone()))
        .and_then(download_shopping_cart);

    let detail = warp::path!("api" / "recipes" / Uuid)
        .and(warp::get())
        .and(with_possible_session(secret.clone()))
        .and(with_state(state.clone()))
        .and_then(recipe_detail);

    let update = warp::path!("api" / "recipes" / Uuid)
        .and(warp::patch())
        .and(with_session(secret.clone()))
        .and(json_body::<RecipeForm>())
        .and(with_state(state.clone()))
        .and_then(patch_recipe);

    let delete = warp::path!("api" / "recipes" / Uuid)
        .and(warp::delete())
        .and(with_session(secret))
        .and(with_state(state))
        .and_then(remove_recipe);

    list.or(create)
        .unify()
        .or(download)
        .unify()
        .or(detail)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
}

/// `POST` and `DELETE` on `/api/recipes/{id}/{segment}` toggling one relation kind.
fn relation_routes(
    kind: RelationKind,
    segment: &'static str,
    state: Arc<State>,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    let path = warp::path("api")
        .and(warp::path("recipes"))
        .and(warp::path::param::<Uuid>())
        .and(warp::path(segment))
        .and(warp::path::end());

    let add = path
        .clone()
        .and(warp::post())
        .and(with_session(state.secret.clone()))
        .and(with_state(state.clone()))
        .and_then(move |recipe_id: Uuid, session: SessionData, state: Arc<State>| {
            post_relation(kind, recipe_id, session, state)
        });

    let remove = path
        .and(warp::delete())
        .and(with_session(state.secret.clone()))
        .and(with_state(state))
        .and_then(move |recipe_id: Uuid, session: SessionData, state: Arc<State>| {
            delete_relation(kind, recipe_id, session, state)
        });

    add.or(remove).unify()
}

fn user_routes(
    state: Arc<State>,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    let secret = state.secret.clone();

    let subscriptions = warp::path!("api" / "users" / "subscriptions")
        .and(warp::get())
        .and(with_session(secret.clone()))
        .and(warp::query::<FormData>())
        .and(with_state(state.clone()))
        .and_then(list_subscriptions);

    let me = warp::path!("api" / "users" / "me")
        .and(warp::get())
        .and(with_session(secret.clone()))
        .and(with_state(state.clone()))
        .and_then(|session: SessionData, state: Arc<State>| async move {
            let result = get_user_profile(session.user_id, Some(session.user_id), &state.pool).await;
            Ok::<_, Infallible>(respond(result, StatusCode::OK))
        });

    let profile = warp::path!("api" / "users" / Uuid)
        .and(warp::get())
        .and(with_possible_session(secret.clone()))
        .and(with_state(state.clone()))
        .and_then(user_profile);

    let follow = warp::path!("api" / "users" / Uuid / "subscribe")
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(warp::query::<FormData>())
        .and(with_state(state.clone()))
        .and_then(post_subscription);

    let unfollow = warp::path!("api" / "users" / Uuid / "subscribe")
        .and(warp::delete())
        .and(with_session(secret))
        .and(with_state(state))
        .and_then(delete_subscription);

    subscriptions
        .or(me)
        .unify()
        .or(profile)
        .unify()
        .or(follow)
        .unify()
        .or(unfollow)
        .unify()
}

fn catalog_routes(
    state: Arc<State>,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    let tags = warp::path!("api" / "tags")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(|state: Arc<State>| async move {
            Ok::<_, Infallible>(respond(list_tags(&state.pool).await, StatusCode::OK))
        });

    let tag = warp::path!("api" / "tags" / Uuid)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(|id: Uuid, state: Arc<State>| async move {
            let result = get_tag(id, &state.pool)
                .await
                .and_then(|tag| tag.ok_or_else(|| ServiceError::not_found("Tag not found")));
            Ok::<_, Infallible>(respond(result, StatusCode::OK))
        });

    let ingredients = warp::path!("api" / "ingredients")
        .and(warp::get())
        .and(warp::query::<FormData>())
        .and(with_state(state.clone()))
        .and_then(|data: FormData, state: Arc<State>| async move {
            let form = Form::from_data(data);
            let result = list_ingredients(form.get_str("name"), &state.pool).await;
            Ok::<_, Infallible>(respond(result, StatusCode::OK))
        });

    let ingredient = warp::path!("api" / "ingredients" / Uuid)
        .and(warp::get())
        .and(with_state(state))
        .and_then(|id: Uuid, state: Arc<State>| async move {
            let result = get_ingredient(id, &state.pool).await.and_then(|ingredient| {
                ingredient.ok_or_else(|| ServiceError::not_found("Ingredient not found"))
            });
            Ok::<_, Infallible>(respond(result, StatusCode::OK))
        });

    tags.or(tag)
        .unify()
        .or(ingredients)
        .unify()
        .or(ingredient)
        .unify()
}

async fn list_recipes(
    data: FormData,
    session: Option<SessionData>,
    state: Arc<State>,
) -> Result<Response, Infallible> {
    let form = Form::from_data(data);
    let viewer = session.map(|s| s.user_id);

    let result = match RecipeFilter::from_form(&form, state.config.page_size) {
        Ok(filter) => fetch_recipes(&filter, viewer, &state.pool).await,
        Err(e) => Err(e),
    };

    Ok(respond(result, StatusCode::OK))
}

async fn recipe_detail(
    id: Uuid,
    session: Option<SessionData>,
    state: Arc<State>,
) -> Result<Response, Infallible> {
    let result = get_recipe_detail(id, session.map(|s| s.user_id), &state.pool).await;

    Ok(respond(result, StatusCode::OK))
}

async fn post_recipe(
    session: SessionData,
    form: RecipeForm,
    state: Arc<State>,
) -> Result<Response, Infallible> {
    let result = match create_recipe(&session, form, &state.config.limits, &state.pool).await {
        Ok(id) => get_recipe_detail(id, Some(session.user_id), &state.pool).await,
        Err(e) => Err(e),
    };

    Ok(respond(result, StatusCode::CREATED))
}

async fn patch_recipe(
    id: Uuid,
    session: SessionData,
    form: RecipeForm,
    state: Arc<State>,
) -> Result<Response, Infallible> {
    let result = match update_recipe(id, &session, form, &state.config.limits, &state.pool).await
    {
        Ok(()) => get_recipe_detail(id, Some(session.user_id), &state.pool).await,
        Err(e) => Err(e),
    };

    Ok(respond(result, StatusCode::OK))
}

async fn remove_recipe(
    id: Uuid,
    session: SessionData,
    state: Arc<State>,
) -> Result<Response, Infallible> {
    Ok(respond_empty(delete_recipe(id, &session, &state.pool).await))
}

async fn post_relation(
    kind: RelationKind,
    recipe_id: Uuid,
    session: SessionData,
    state: Arc<State>,
) -> Result<Response, Infallible> {
    let result = match session.authenticate(ActionType::ManageOwnRelations) {
        Ok(()) => add_relation(kind, session.user_id, recipe_id, &state.pool).await,
        Err(e) => Err(e),
    };

    Ok(respond(result, StatusCode::CREATED))
}

async fn delete_relation(
    kind: RelationKind,
    recipe_id: Uuid,
    session: SessionData,
    state: Arc<State>,
) -> Result<Response, Infallible> {
    let result = match session.authenticate(ActionType::ManageOwnRelations) {
        Ok(()) => remove_relation(kind, session.user_id, recipe_id, &state.pool).await,
        Err(e) => Err(e),
    };

    Ok(respond_empty(result))
}

async fn download_shopping_cart(
    session: SessionData,
    state: Arc<State>,
) -> Result<Response, Infallible> {
    let entries = match build_shopping_list(session.user_id, &state.pool).await {
        Ok(entries) => entries,
        Err(e) => return Ok(e.into_response()),
    };

    let body = reply::with_header(
        render_shopping_list(&entries),
        "Content-Type",
        "text/plain; charset=utf-8",
    );
    let attachment = reply::with_header(
        body,
        "Content-Disposition",
        format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
    );

    Ok(attachment.into_response())
}

async fn user_profile(
    id: Uuid,
    session: Option<SessionData>,
    state: Arc<State>,
) -> Result<Response, Infallible> {
    let result = get_user_profile(id, session.map(|s| s.user_id), &state.pool).await;

    Ok(respond(result, StatusCode::OK))
}

async fn list_subscriptions(
    session: SessionData,
    data: FormData,
    state: Arc<State>,
) -> Result<Response, Infallible> {
    let form = Form::from_data(data);

    let page = match PageRequest::from_form(&form, state.config.page_size) {
        Ok(page) => page,
        Err(e) => return Ok(e.into_response()),
    };

    let result = match form.get_number::<i64>("recipes_limit") {
        Ok(limit) => fetch_subscriptions(session.user_id, page, limit, &state.pool).await,
        Err(e) => Err(e),
    };

    Ok(respond(result, StatusCode::OK))
}

async fn post_subscription(
    author_id: Uuid,
    session: SessionData,
    data: FormData,
    state: Arc<State>,
) -> Result<Response, Infallible> {
    let form = Form::from_data(data);

    let result = match form.get_number::<i64>("recipes_limit") {
        Ok(limit) => subscribe(session.user_id, author_id, limit, &state.pool).await,
        Err(e) => Err(e),
    };

    Ok(respond(result, StatusCode::CREATED))
}

async fn delete_subscription(
    author_id: Uuid,
    session: SessionData,
    state: Arc<State>,
) -> Result<Response, Infallible> {
    Ok(respond_empty(
        unsubscribe(session.user_id, author_id, &state.pool).await,
    ))
}

pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    log::debug!("> Rejected request: {err:?}");

    let (status, detail) = if err.find::<Unauthorized>().is_some() {
        (StatusCode::UNAUTHORIZED, ServiceError::Unauthorized.to_string())
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Malformed request body: {e}"))
    } else if err.find::<PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Request body is too large".to_owned())
    } else if err.find::<LengthRequired>().is_some() {
        (
            StatusCode::LENGTH_REQUIRED,
            "Content-Length header is required".to_owned(),
        )
    } else if err.find::<UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Expected a JSON body".to_owned(),
        )
    } else if err.find::<InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "Malformed query string".to_owned())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_owned())
    } else if err.find::<MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_owned())
    } else {
        log::error!("> Unhandled rejection: {err:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_owned(),
        )
    };

    Ok(reply::with_status(reply::json(&json!({ "detail": detail })), status).into_response())
}
