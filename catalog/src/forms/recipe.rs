use super::{Cleaner, FieldKind, FieldSpec, FormErrors, RawForm, Widget};
use crate::basic_models::{CookingTime, RecipeFields, UploadedFile};

pub const TITLE: FieldSpec = FieldSpec {
    name: "title",
    label: "Title",
    help_text: "Enter the title of the recipe",
    required: true,
    kind: FieldKind::Char {
        max_length: Some(300),
    },
    widget: Widget::Input {
        input_type: "text",
    },
};

pub const DESCRIPTION: FieldSpec = FieldSpec {
    name: "description",
    label: "Description",
    help_text: "Enter the description of the recipe",
    required: true,
    kind: FieldKind::Char { max_length: None },
    widget: Widget::Textarea { rows: 4 },
};

pub const COOKING_TIME: FieldSpec = FieldSpec {
    name: "cooking_time",
    label: "Cooking time",
    help_text: "Enter the cooking time of the recipe in minutes",
    required: true,
    kind: FieldKind::Duration,
    widget: Widget::Input {
        input_type: "text",
    },
};

pub const IMAGE: FieldSpec = FieldSpec {
    name: "image",
    label: "Image",
    help_text: "Upload an image for the recipe",
    required: false,
    kind: FieldKind::Image,
    widget: Widget::File { accept: "image/*" },
};

pub const INGREDIENTS: FieldSpec = FieldSpec {
    name: "ingredients",
    label: "Ingredients",
    help_text: "Select the ingredients for the recipe",
    required: true,
    kind: FieldKind::ModelMultipleChoice,
    widget: Widget::SelectMultiple { class: "select2" },
};

pub const FIELDS: &[FieldSpec] = &[TITLE, DESCRIPTION, COOKING_TIME, IMAGE, INGREDIENTS];

/// A valid submission: the recipe columns and the image to store, if one was sent.
#[derive(Debug)]
pub struct CleanedRecipe<'f> {
    pub fields: RecipeFields,
    pub image: Option<&'f UploadedFile>,
}

/// Clean a submission against the ingredient ids that currently exist.
pub fn clean<'f>(
    raw: &RawForm,
    files: &'f [UploadedFile],
    ingredient_ids: &[i64],
) -> Result<CleanedRecipe<'f>, FormErrors> {
    let mut cleaner = Cleaner::new(raw);
    let title = cleaner.char(&TITLE);
    let description = cleaner.char(&DESCRIPTION);
    let cooking_time = cleaner.duration(&COOKING_TIME);
    let image = cleaner.image(&IMAGE, files);
    let ingredients = cleaner.model_multiple_choice(&INGREDIENTS, ingredient_ids);
    match (title, description, cooking_time, image, ingredients) {
        (Some(title), Some(description), Some(cooking_time), Some(image), Some(ingredient_ids))
            if cleaner.is_valid() =>
        {
            Ok(CleanedRecipe {
                fields: RecipeFields {
                    title,
                    description,
                    cooking_time,
                    ingredient_ids,
                },
                image,
            })
        }
        _ => Err(cleaner.into_errors()),
    }
}

/// Form data for a new recipe.
pub fn blank() -> RawForm {
    RawForm::from_pairs([(COOKING_TIME.name, CookingTime::DEFAULT.to_string())])
}

/// Form data pre-filled from an existing recipe.
pub fn initial(fields: &RecipeFields) -> RawForm {
    let mut raw = RawForm::from_pairs([
        (TITLE.name, fields.title.clone()),
        (DESCRIPTION.name, fields.description.clone()),
        (COOKING_TIME.name, fields.cooking_time.to_string()),
    ]);
    for id in &fields.ingredient_ids {
        raw.push(INGREDIENTS.name, id.to_string());
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> RawForm {
        RawForm::from_pairs([
            ("title", "Fried Egg"),
            ("description", "Crack, fry, serve."),
            ("cooking_time", "00:10:00"),
            ("ingredients", "1"),
        ])
    }

    #[test]
    fn cleans_a_valid_recipe_without_image() {
        let cleaned = clean(&submission(), &[], &[1, 2]).unwrap();
        assert_eq!(cleaned.fields.title, "Fried Egg");
        assert_eq!(cleaned.fields.cooking_time, CookingTime::from_minutes(10));
        assert_eq!(cleaned.fields.ingredient_ids, [1]);
        assert!(cleaned.image.is_none());
    }

    #[test]
    fn rejects_files_that_are_not_images() {
        let files = [UploadedFile {
            field_name: "image".into(),
            file_name: "egg.png".into(),
            content_type: Some("image/png".into()),
            content_bytes: b"definitely not a png".to_vec(),
        }];
        let errors = clean(&submission(), &files, &[1]).unwrap_err();
        assert_eq!(errors.field("image").len(), 1);
        assert!(errors.field("title").is_empty());
    }

    #[test]
    fn requires_ingredients_and_a_duration() {
        let raw = RawForm::from_pairs([
            ("title", "Toast"),
            ("description", "Bread, heat."),
            ("cooking_time", "soon"),
        ]);
        let errors = clean(&raw, &[], &[1]).unwrap_err();
        assert_eq!(errors.field("cooking_time"), ["Enter a valid duration."]);
        assert_eq!(errors.field("ingredients"), [super::super::REQUIRED]);
    }

    #[test]
    fn initial_round_trips_through_clean() {
        let fields = RecipeFields {
            title: "Pancakes".into(),
            description: "Flip them.".into(),
            cooking_time: CookingTime::from_minutes(25),
            ingredient_ids: vec![3, 1],
        };
        let cleaned = clean(&initial(&fields), &[], &[1, 2, 3]).unwrap();
        assert_eq!(cleaned.fields, fields);
        assert_eq!(blank().get("cooking_time"), Some("0:05:00"));
    }
}
