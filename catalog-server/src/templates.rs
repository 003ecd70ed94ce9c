use minijinja::{context, Value};

use crate::models::User;

lazy_static::lazy_static! {
    static ref TEMPLATES: minijinja::Environment<'static> = {
        let mut env = minijinja::Environment::new();
        for (name, template) in &[
            ("base.html.jinja", include_str!("../templates/base.html.jinja")),
            ("forms.html.jinja", include_str!("../templates/forms.html.jinja")),
            ("index.html.jinja", include_str!("../templates/index.html.jinja")),
            ("recipe.html.jinja", include_str!("../templates/recipe.html.jinja")),
            ("recipe_form.html.jinja", include_str!("../templates/recipe_form.html.jinja")),
            ("confirm_delete.html.jinja", include_str!("../templates/confirm_delete.html.jinja")),
            ("ingredients.html.jinja", include_str!("../templates/ingredients.html.jinja")),
            ("ingredient_form.html.jinja", include_str!("../templates/ingredient_form.html.jinja")),
            ("about.html.jinja", include_str!("../templates/about.html.jinja")),
            ("form_user_test.html.jinja", include_str!("../templates/form_user_test.html.jinja")),
            ("404.html.jinja", include_str!("../templates/404.html.jinja")),
            ("auth/login.html.jinja", include_str!("../templates/auth/login.html.jinja")),
            ("auth/password_change.html.jinja", include_str!("../templates/auth/password_change.html.jinja")),
            ("auth/password_change_done.html.jinja", include_str!("../templates/auth/password_change_done.html.jinja")),
            ("admin/index.html.jinja", include_str!("../templates/admin/index.html.jinja")),
            ("admin/change_list.html.jinja", include_str!("../templates/admin/change_list.html.jinja")),
            ("admin/change_form.html.jinja", include_str!("../templates/admin/change_form.html.jinja")),
        ] {
            env.add_template(name, template)
                .expect("Failed to register template");
        }
        env
    };
}

/// Render a registered template. Every page gets the signed-in user as `user`.
pub fn render(name: &str, user: Option<&User>, ctx: Value) -> Result<String, minijinja::Error> {
    TEMPLATES
        .get_template(name)?
        .render(context! { user => user, ..ctx })
}

pub fn render_not_found() -> Result<String, minijinja::Error> {
    render("404.html.jinja", None, context! {})
}
