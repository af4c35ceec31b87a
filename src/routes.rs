use crate::database::Storage;
use crate::error::ServiceError;
use crate::films::{FilmService, LikeService, DEFAULT_POPULAR_COUNT};
use crate::model::*;
use crate::users::{FriendService, UserService};
use actix_web::{error, web, HttpRequest, HttpResponse};
use log::debug;
use serde::Deserialize;

type Db<D> = web::Data<D>;
type Result = std::result::Result<HttpResponse, ServiceError>;

/// Turns malformed JSON bodies into validation errors.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err: error::JsonPayloadError, _req: &HttpRequest| {
        debug!("{:?}", err);
        ServiceError::validation(format!("Malformed request body: {}", err)).into()
    })
}

pub fn configure<D: Storage>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/users")
            .route(web::get().to(list_users::<D>))
            .route(web::post().to(create_user::<D>))
            .route(web::put().to(update_user::<D>)),
    )
    .service(web::resource("/users/{id}").route(web::get().to(get_user::<D>)))
    .service(web::resource("/users/{id}/friends").route(web::get().to(friends::<D>)))
    .service(
        web::resource("/users/{id}/friends/common/{other_id}")
            .route(web::get().to(common_friends::<D>)),
    )
    .service(
        web::resource("/users/{id}/friends/{friend_id}")
            .route(web::put().to(add_friend::<D>))
            .route(web::delete().to(remove_friend::<D>)),
    )
    .service(
        web::resource("/films")
            .route(web::get().to(list_films::<D>))
            .route(web::post().to(create_film::<D>))
            .route(web::put().to(update_film::<D>)),
    )
    .service(web::resource("/films/popular").route(web::get().to(popular_films::<D>)))
    .service(web::resource("/films/{id}").route(web::get().to(get_film::<D>)))
    .service(
        web::resource("/films/{id}/like/{user_id}")
            .route(web::put().to(add_like::<D>))
            .route(web::delete().to(remove_like::<D>)),
    );
}

async fn list_users<D: Storage>(db: Db<D>) -> Result {
    let users = UserService::new(db.get_ref()).find_all()?;
    Ok(HttpResponse::Ok().json(users))
}

async fn get_user<D: Storage>(db: Db<D>, id: web::Path<u64>) -> Result {
    let user = UserService::new(db.get_ref()).get_by_id(id.into_inner())?;
    Ok(HttpResponse::Ok().json(user))
}

async fn create_user<D: Storage>(db: Db<D>, user: web::Json<User>) -> Result {
    let user = UserService::new(db.get_ref()).create(user.into_inner())?;
    Ok(HttpResponse::Ok().json(user))
}

async fn update_user<D: Storage>(db: Db<D>, user: web::Json<User>) -> Result {
    let user = UserService::new(db.get_ref()).update(user.into_inner())?;
    Ok(HttpResponse::Ok().json(user))
}

async fn add_friend<D: Storage>(db: Db<D>, path: web::Path<(u64, u64)>) -> Result {
    let (id, friend_id) = path.into_inner();
    FriendService::new(db.get_ref()).add_friend(id, friend_id)?;
    Ok(HttpResponse::Ok().finish())
}

async fn remove_friend<D: Storage>(db: Db<D>, path: web::Path<(u64, u64)>) -> Result {
    let (id, friend_id) = path.into_inner();
    FriendService::new(db.get_ref()).remove_friend(id, friend_id)?;
    Ok(HttpResponse::Ok().finish())
}

async fn friends<D: Storage>(db: Db<D>, id: web::Path<u64>) -> Result {
    let friends = FriendService::new(db.get_ref()).get_friends(id.into_inner())?;
    Ok(HttpResponse::Ok().json(friends))
}

async fn common_friends<D: Storage>(db: Db<D>, path: web::Path<(u64, u64)>) -> Result {
    let (id, other_id) = path.into_inner();
    let friends = FriendService::new(db.get_ref()).get_common_friends(id, other_id)?;
    Ok(HttpResponse::Ok().json(friends))
}

async fn list_films<D: Storage>(db: Db<D>) -> Result {
    let films = FilmService::new(db.get_ref()).find_all()?;
    Ok(HttpResponse::Ok().json(films))
}

async fn get_film<D: Storage>(db: Db<D>, id: web::Path<u64>) -> Result {
    let film = FilmService::new(db.get_ref()).get_by_id(id.into_inner())?;
    Ok(HttpResponse::Ok().json(film))
}

async fn create_film<D: Storage>(db: Db<D>, film: web::Json<Film>) -> Result {
    let film = FilmService::new(db.get_ref()).create(film.into_inner())?;
    Ok(HttpResponse::Ok().json(film))
}

async fn update_film<D: Storage>(db: Db<D>, film: web::Json<Film>) -> Result {
    let film = FilmService::new(db.get_ref()).update(film.into_inner())?;
    Ok(HttpResponse::Ok().json(film))
}

async fn add_like<D: Storage>(db: Db<D>, path: web::Path<(u64, u64)>) -> Result {
    let (id, user_id) = path.into_inner();
    LikeService::new(db.get_ref()).add_like(id, user_id)?;
    Ok(HttpResponse::Ok().finish())
}

async fn remove_like<D: Storage>(db: Db<D>, path: web::Path<(u64, u64)>) -> Result {
    let (id, user_id) = path.into_inner();
    LikeService::new(db.get_ref()).remove_like(id, user_id)?;
    Ok(HttpResponse::Ok().finish())
}

#[derive(Deserialize)]
struct PopularParams {
    count: Option<usize>,
}

async fn popular_films<D: Storage>(db: Db<D>, params: web::Query<PopularParams>) -> Result {
    let count = params.count.unwrap_or(DEFAULT_POPULAR_COUNT);
    let films = LikeService::new(db.get_ref()).get_most_popular(count)?;
    Ok(HttpResponse::Ok().json(films))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDb;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};

    macro_rules! app {
        ($db:expr) => {
            test::init_service(
                App::new()
                    .app_data($db.clone())
                    .app_data(json_config())
                    .configure(configure::<MemoryDb>),
            )
            .await
        };
    }

    fn new_user(login: &str) -> Value {
        json!({
            "email": format!("{}@mail.ru", login),
            "login": login,
            "name": "",
            "birthday": "2000-01-01"
        })
    }

    fn new_film(name: &str) -> Value {
        json!({
            "name": name,
            "description": "Description",
            "releaseDate": "2000-01-01",
            "duration": 120
        })
    }

    #[actix_rt::test]
    async fn user_lifecycle() {
        let db = web::Data::new(MemoryDb::new());
        let app = app!(db);

        let req = test::TestRequest::post()
            .uri("/users")
            .set_json(&new_user("login"))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(created["id"], 1);
        assert_eq!(created["name"], "login");
        assert_eq!(created["friends"], json!([]));

        let mut changed = new_user("newlogin");
        changed["id"] = json!(1);
        changed["name"] = json!("newname");
        let req = test::TestRequest::put()
            .uri("/users")
            .set_json(&changed)
            .to_request();
        let updated: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(updated["login"], "newlogin");
        assert_eq!(updated["name"], "newname");

        let req = test::TestRequest::get().uri("/users/1").to_request();
        let fetched: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(fetched, updated);

        let req = test::TestRequest::get().uri("/users").to_request();
        let all: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(all.as_array().map(Vec::len), Some(1));
    }

    #[actix_rt::test]
    async fn null_name_and_description_are_accepted() {
        let db = web::Data::new(MemoryDb::new());
        let app = app!(db);

        let mut user = new_user("neo");
        user["name"] = Value::Null;
        let req = test::TestRequest::post()
            .uri("/users")
            .set_json(&user)
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(created["name"], "neo");

        user["id"] = created["id"].clone();
        user["login"] = json!("trinity");
        let req = test::TestRequest::put()
            .uri("/users")
            .set_json(&user)
            .to_request();
        let updated: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(updated["name"], "trinity");

        let mut film = new_film("Alien");
        film["description"] = Value::Null;
        let req = test::TestRequest::post()
            .uri("/films")
            .set_json(&film)
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(created["description"], "");
    }

    #[actix_rt::test]
    async fn invalid_and_missing_users() {
        let db = web::Data::new(MemoryDb::new());
        let app = app!(db);

        let mut bad = new_user("login");
        bad["login"] = json!("two words");
        let req = test::TestRequest::post()
            .uri("/users")
            .set_json(&bad)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/users")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::put()
            .uri("/users")
            .set_json(&new_user("login"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let mut ghost = new_user("login");
        ghost["id"] = json!(999999);
        let req = test::TestRequest::put()
            .uri("/users")
            .set_json(&ghost)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri("/users/5").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let req = test::TestRequest::get().uri("/users/5").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["error"], "User with id = 5 not found");
    }

    #[actix_rt::test]
    async fn friends_endpoints() {
        let db = web::Data::new(MemoryDb::new());
        let app = app!(db);
        for login in &["a", "b", "c"] {
            let req = test::TestRequest::post()
                .uri("/users")
                .set_json(&new_user(login))
                .to_request();
            assert!(test::call_service(&app, req).await.status().is_success());
        }

        for path in &["/users/1/friends/2", "/users/1/friends/3"] {
            let req = test::TestRequest::put().uri(path).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }

        let req = test::TestRequest::get().uri("/users/1/friends").to_request();
        let friends: Value = test::call_and_read_body_json(&app, req).await;
        let ids: Vec<&Value> = friends.as_array().unwrap().iter().map(|f| &f["id"]).collect();
        assert_eq!(ids, vec![&json!(2), &json!(3)]);

        let req = test::TestRequest::get()
            .uri("/users/2/friends/common/3")
            .to_request();
        let common: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(common.as_array().map(Vec::len), Some(1));
        assert_eq!(common[0]["id"], 1);

        let req = test::TestRequest::delete()
            .uri("/users/2/friends/1")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get().uri("/users/2/friends").to_request();
        let friends: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(friends, json!([]));

        let req = test::TestRequest::put().uri("/users/1/friends/9").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_rt::test]
    async fn films_likes_and_popularity() {
        let db = web::Data::new(MemoryDb::new());
        let app = app!(db);
        for name in &["first", "second"] {
            let req = test::TestRequest::post()
                .uri("/films")
                .set_json(&new_film(name))
                .to_request();
            assert!(test::call_service(&app, req).await.status().is_success());
        }
        let req = test::TestRequest::post()
            .uri("/users")
            .set_json(&new_user("fan"))
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());

        let req = test::TestRequest::put().uri("/films/2/like/1").to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::OK
        );

        let req = test::TestRequest::get().uri("/films/popular").to_request();
        let popular: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(popular[0]["id"], 2);
        assert_eq!(popular[0]["likes"], json!([1]));
        assert_eq!(popular.as_array().map(Vec::len), Some(2));

        let req = test::TestRequest::get()
            .uri("/films/popular?count=1")
            .to_request();
        let popular: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(popular.as_array().map(Vec::len), Some(1));

        let req = test::TestRequest::delete().uri("/films/2/like/1").to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::OK
        );
        let req = test::TestRequest::get().uri("/films/2").to_request();
        let film: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(film["likes"], json!([]));

        let req = test::TestRequest::put().uri("/films/7/like/1").to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[actix_rt::test]
    async fn film_validation() {
        let db = web::Data::new(MemoryDb::new());
        let app = app!(db);

        let mut early = new_film("early");
        early["releaseDate"] = json!("1895-12-28");
        let req = test::TestRequest::post()
            .uri("/films")
            .set_json(&early)
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::OK
        );

        early["releaseDate"] = json!("1895-12-27");
        let req = test::TestRequest::post()
            .uri("/films")
            .set_json(&early)
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );

        let mut long = new_film("long");
        long["description"] = json!("a".repeat(201));
        let req = test::TestRequest::post()
            .uri("/films")
            .set_json(&long)
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );
    }
}
