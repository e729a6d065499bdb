use axum::{
    Router,
    extract::{Form, Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{Local, NaiveDateTime};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::AppState;
use crate::api::models::{
    AboutContext, AddCategoryContext, AddPageContext, CategoryContext, IndexContext, LoginContext,
    RegisterContext,
};
use crate::api::response;
use crate::auth::{self, NewUser};
use crate::error::{AppError, Result};
use crate::forms::{CategoryForm, FormErrors, LoginForm, PageForm, RegistrationForm};
use crate::store::StoreError;
use crate::visits::{VisitCookies, VisitTracker};

pub const INDEX_URL: &str = "/rango/";

/// How many categories and pages the index lists.
const TOP_N: usize = 5;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::to(INDEX_URL) }))
        .route("/rango/", get(index))
        .route("/rango/about/", get(about))
        .route("/rango/add_category/", get(add_category_form).post(add_category))
        .route("/rango/category/:category_name_slug/", get(show_category))
        .route(
            "/rango/category/:category_name_slug/add_page/",
            get(add_page_form).post(add_page),
        )
        .route("/rango/register/", get(register_form).post(register))
        .route("/rango/login/", get(login_form).post(user_login))
        .route("/rango/logout/", get(user_logout))
        .route("/rango/restricted/", get(restricted))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Updates the visit counter in the client's session and returns the jar
/// carrying the session and visit cookies.
fn track_visit(state: &AppState, jar: CookieJar) -> (CookieJar, u32) {
    let (id, mut session) = state.sessions.load(&jar);
    let visit = VisitTracker::apply(&mut session, &VisitCookies::from(&jar), now());
    let jar = state.sessions.save(jar, id, session);
    (visit.write_cookies(jar), visit.visits)
}

async fn index(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let categories = state.store.top_categories(TOP_N);
    let pages = state.store.top_pages(TOP_N);
    let (jar, visits) = track_visit(&state, jar);
    debug!(visits, "rendering index");

    (
        jar,
        response::render(
            "rango/index.html",
            IndexContext {
                categories,
                pages,
                visits,
            },
        ),
    )
}

async fn about(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let (jar, visits) = track_visit(&state, jar);

    (
        jar,
        response::render(
            "rango/about.html",
            AboutContext {
                about_message: state.config.about_message.clone(),
                visits,
            },
        ),
    )
}

async fn show_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> impl IntoResponse {
    response::render("rango/category.html", category_context(&state, &slug))
}

fn category_context(state: &AppState, slug: &str) -> CategoryContext {
    match state.store.category_by_slug(slug) {
        Some(category) => {
            let pages = state.store.pages_in(category.id);
            CategoryContext {
                category: Some(category),
                pages: Some(pages),
            }
        }
        None => {
            debug!(slug, "no category for slug");
            CategoryContext {
                category: None,
                pages: None,
            }
        }
    }
}

async fn add_category_form() -> impl IntoResponse {
    response::render(
        "rango/add_category.html",
        AddCategoryContext {
            form: CategoryForm::default(),
            errors: FormErrors::default(),
        },
    )
}

async fn add_category(
    State(state): State<AppState>,
    Form(form): Form<CategoryForm>,
) -> Result<Response> {
    let errors = match form.validate(&state.store) {
        Ok(name) => match state.store.create_category(&name) {
            Ok(category) => {
                info!(slug = %category.slug, "created category");
                return Ok(Redirect::to(INDEX_URL).into_response());
            }
            Err(StoreError::DuplicateCategory(_)) => {
                let mut errors = FormErrors::default();
                errors.add("name", "Category with this Name already exists.");
                errors
            }
            Err(err) => return Err(AppError::InternalError(err.to_string())),
        },
        Err(errors) => errors,
    };

    warn!(?errors, "invalid category form");
    Ok(response::render("rango/add_category.html", AddCategoryContext { form, errors }).into_response())
}

async fn add_page_form(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> impl IntoResponse {
    response::render(
        "rango/add_page.html",
        AddPageContext {
            form: PageForm::default(),
            category: state.store.category_by_slug(&slug),
            errors: FormErrors::default(),
        },
    )
}

async fn add_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Form(form): Form<PageForm>,
) -> Result<Response> {
    let category = state.store.category_by_slug(&slug);

    match form.validate() {
        Ok(clean) => match category {
            Some(category) => {
                let page = state
                    .store
                    .create_page(category.id, &clean.title, &clean.url)
                    .map_err(|e| AppError::InternalError(e.to_string()))?;
                info!(category = %category.slug, page = page.id, "added page");
                let target = format!("/rango/category/{}/", category.slug);
                Ok(Redirect::to(&target).into_response())
            }
            None => {
                warn!(%slug, "page submitted for unknown category");
                Ok(response::render("rango/category.html", category_context(&state, &slug))
                    .into_response())
            }
        },
        Err(errors) => {
            warn!(?errors, "invalid page form");
            Ok(response::render(
                "rango/add_page.html",
                AddPageContext {
                    form,
                    category,
                    errors,
                },
            )
            .into_response())
        }
    }
}

async fn register_form() -> impl IntoResponse {
    response::render(
        "rango/register.html",
        RegisterContext {
            user_form: Default::default(),
            user_errors: FormErrors::default(),
            profile_form: Default::default(),
            profile_errors: FormErrors::default(),
            registered: false,
        },
    )
}

async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegistrationForm>,
) -> impl IntoResponse {
    let user = form.user.validate(&state.users);
    let profile = form.profile.validate();

    let mut registered = false;
    let (user_errors, profile_errors) = match (user, profile) {
        (Ok(user), Ok(website)) => {
            let new = NewUser {
                username: user.username,
                email: user.email,
                password: user.password,
                website,
            };
            match state.users.register(new) {
                Ok(user) => {
                    info!(username = %user.username, "registered user");
                    registered = true;
                    (FormErrors::default(), FormErrors::default())
                }
                Err(err) => {
                    let mut errors = FormErrors::default();
                    errors.add("username", err.to_string());
                    (errors, FormErrors::default())
                }
            }
        }
        (user, profile) => (user.err().unwrap_or_default(), profile.err().unwrap_or_default()),
    };

    if !registered {
        warn!(?user_errors, ?profile_errors, "invalid registration");
    }

    response::render(
        "rango/register.html",
        RegisterContext {
            user_form: form.user,
            user_errors,
            profile_form: form.profile,
            profile_errors,
            registered,
        },
    )
}

async fn login_form() -> impl IntoResponse {
    response::render("rango/login.html", LoginContext {})
}

async fn user_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    match state.users.authenticate(&form.username, &form.password) {
        Some(user) if user.is_active => {
            let (id, mut session) = state.sessions.load(&jar);
            auth::login(&mut session, &user);
            let jar = state.sessions.cycle(jar, id, session);
            info!(username = %user.username, "user logged in");
            (jar, Redirect::to(INDEX_URL)).into_response()
        }
        Some(user) => {
            info!(username = %user.username, "login refused for disabled account");
            "Your Rango account is disabled.".into_response()
        }
        None => {
            warn!(username = %form.username, "invalid login details");
            "Invalid login details supplied.".into_response()
        }
    }
}

async fn user_logout(State(state): State<AppState>, jar: CookieJar) -> Result<impl IntoResponse> {
    let (id, session) = state.sessions.load(&jar);
    let user = auth::require_login(&session)?;
    let jar = state.sessions.flush(jar, id);
    info!(user, "user logged out");
    Ok((jar, Redirect::to(INDEX_URL)))
}

async fn restricted(State(state): State<AppState>, jar: CookieJar) -> Result<&'static str> {
    let (_, session) = state.sessions.load(&jar);
    auth::require_login(&session)?;
    Ok("Since you're logged in, you can see this text!")
}
