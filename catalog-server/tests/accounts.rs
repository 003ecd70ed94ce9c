mod common;

use axum::http::{header, StatusCode};
use catalog_server::{
    auth,
    models::{Recipe, RecipeIngredient},
};
use common::{body_text, location, TestApp};

fn session_from(response: &axum::http::Response<axum::body::Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookie| cookie.strip_prefix("session_id="))
        .and_then(|rest| rest.split(';').next())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

#[tokio::test]
async fn login_follows_next_and_sets_a_session() {
    let app = TestApp::new().await;
    auth::create_user(&app.state.db, "ada", "analytical", false).unwrap();

    let page = app.get("/auth/login/?next=/recipe/", None).await;
    assert_eq!(page.status(), StatusCode::OK);
    assert!(body_text(page).await.contains("name=\"next\""));

    let response = app
        .post_form(
            "/auth/login/",
            &[("username", "ada"), ("password", "wrong"), ("next", "/recipe/")],
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_from(&response).is_none());
    assert!(body_text(response)
        .await
        .contains("Please enter a correct username and password."));

    let response = app
        .post_form(
            "/auth/login/",
            &[("username", "ada"), ("password", "analytical"), ("next", "/recipe/")],
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/recipe/");
    let session = session_from(&response).unwrap();

    let response = app.get("/recipe/", Some(&session)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_ignores_offsite_next() {
    let app = TestApp::new().await;
    auth::create_user(&app.state.db, "ada", "analytical", false).unwrap();
    let response = app
        .post_form(
            "/auth/login/",
            &[
                ("username", "ada"),
                ("password", "analytical"),
                ("next", "https://elsewhere.example/"),
            ],
            None,
        )
        .await;
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = TestApp::new().await;
    let (_, session) = app.sign_in("ada", false);
    assert_eq!(app.state.sessions.len(), 1);

    let response = app.post_form("/auth/logout/", &[], Some(&session)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert!(app.state.sessions.is_empty());

    let response = app.get("/recipe/", Some(&session)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn password_change_checks_the_old_password() {
    let app = TestApp::new().await;
    let (_, session) = app.sign_in("ada", false);
    let other_session = app.state.sessions.create(
        auth::authenticate(&app.state.db, "ada", "kitchen-secret")
            .unwrap()
            .unwrap()
            .user_id,
    );

    let response = app
        .post_form(
            "/auth/password_change/",
            &[
                ("old_password", "guess"),
                ("new_password1", "a-new-secret"),
                ("new_password2", "a-new-secret"),
            ],
            Some(&session),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response)
        .await
        .contains("Your old password was entered incorrectly."));

    let response = app
        .post_form(
            "/auth/password_change/",
            &[
                ("old_password", "kitchen-secret"),
                ("new_password1", "a-new-secret"),
                ("new_password2", "a-new-secret"),
            ],
            Some(&session),
        )
        .await;
    assert_eq!(location(&response), "/auth/password_change/done/");
    assert!(auth::authenticate(&app.state.db, "ada", "a-new-secret")
        .unwrap()
        .is_some());

    // Only the session that made the change survives
    let done = app.get("/auth/password_change/done/", Some(&session)).await;
    assert_eq!(done.status(), StatusCode::OK);
    let elsewhere = app.get("/auth/password_change/done/", Some(&other_session)).await;
    assert_eq!(elsewhere.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn admin_is_for_staff_only() {
    let app = TestApp::new().await;
    let (_, cook) = app.sign_in("cook", false);
    let (_, admin) = app.sign_in("admin", true);

    let response = app.get("/admin/", None).await;
    assert_eq!(location(&response), "/auth/login/?next=/admin/");
    let response = app.get("/admin/", Some(&cook)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    app.recipe("Soup", vec![], None);
    let response = app.get("/admin/", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("/admin/recipe/"));
    assert!(body.contains("/admin/ingredient/"));

    let response = app.get("/admin/user/", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_change_lists_show_their_columns() {
    let app = TestApp::new().await;
    let (_, admin) = app.sign_in("admin", true);
    app.ingredient("Flour", "2.5");
    app.recipe("Bread", vec![], None);

    let body = body_text(app.get("/admin/ingredient/", Some(&admin)).await).await;
    assert!(body.contains("weight ready"));
    assert!(body.contains("2.50"));
    assert_eq!(body.matches("class=\"admin-row\"").count(), 1);

    let body = body_text(app.get("/admin/recipe/", Some(&admin)).await).await;
    assert!(body.contains("How to make Bread"));
}

#[tokio::test]
async fn admin_recipe_inline_rejects_duplicates() {
    let app = TestApp::new().await;
    let (_, admin) = app.sign_in("admin", true);
    let egg = app.ingredient("Egg", "10.00");
    let milk = app.ingredient("Milk", "1.00");
    let recipe_id = app.recipe("Omelette", vec![egg], None);
    let change = format!("/admin/recipe/{recipe_id}/change/");

    let page = body_text(app.get(&change, Some(&admin)).await).await;
    assert_eq!(page.matches("name=\"add_ingredient\"").count(), 5);

    let egg_id = egg.to_string();
    let milk_id = milk.to_string();
    let response = app
        .post_form(
            &change,
            &[
                ("title", "Omelette"),
                ("description", "Whisk and fry."),
                ("cooking_time", "0:05:00"),
                ("add_ingredient", &egg_id),
            ],
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response)
        .await
        .contains("Please correct the duplicate data for ingredient"));
    let recipe = Recipe::get_by_id(&app.state.db, recipe_id).unwrap().unwrap();
    assert_eq!(recipe.description, "How to make Omelette");

    let response = app
        .post_form(
            &change,
            &[
                ("title", "Omelette"),
                ("description", "Whisk and fry."),
                ("cooking_time", "0:05:00"),
                ("delete_link", &egg_id),
                ("add_ingredient", &milk_id),
                ("add_ingredient", ""),
            ],
            Some(&admin),
        )
        .await;
    assert_eq!(location(&response), "/admin/recipe/");
    let links = RecipeIngredient::list_for_recipe(&app.state.db, recipe_id).unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].ingredient_id, milk);
}

#[tokio::test]
async fn admin_deletes_after_confirmation() {
    let app = TestApp::new().await;
    let (_, admin) = app.sign_in("admin", true);
    let recipe_id = app.recipe("Stew", vec![], None);
    let delete = format!("/admin/recipe/{recipe_id}/delete/");

    let response = app.get(&delete, Some(&admin)).await;
    assert!(body_text(response).await.contains("Stew"));
    let response = app.post_form(&delete, &[], Some(&admin)).await;
    assert_eq!(location(&response), "/admin/recipe/");
    assert_eq!(Recipe::count(&app.state.db).unwrap(), 0);

    let response = app.post_form(&delete, &[], Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
