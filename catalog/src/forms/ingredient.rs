use super::{Cleaner, FieldKind, FieldSpec, FormErrors, RawForm, Widget};
use crate::basic_models::{format_price, IngredientFields};

pub const NAME: FieldSpec = FieldSpec {
    name: "name",
    label: "Name",
    help_text: "Enter the name of the ingredient",
    required: true,
    kind: FieldKind::Char {
        max_length: Some(255),
    },
    widget: Widget::Input {
        input_type: "text",
    },
};

pub const WEIGHT: FieldSpec = FieldSpec {
    name: "weight",
    label: "Weight",
    help_text: "Enter the weight of the ingredient in grams",
    required: true,
    kind: FieldKind::PositiveInteger,
    widget: Widget::Input {
        input_type: "number",
    },
};

pub const WEIGHT_READY: FieldSpec = FieldSpec {
    name: "weight_ready",
    label: "Weight ready",
    help_text: "Enter the weight of the ingredient in grams after cooking",
    required: true,
    kind: FieldKind::PositiveInteger,
    widget: Widget::Input {
        input_type: "number",
    },
};

pub const PRICE: FieldSpec = FieldSpec {
    name: "price",
    label: "Price",
    help_text: "Enter the price of the ingredient in rubles",
    required: true,
    kind: FieldKind::Decimal {
        max_digits: 10,
        decimal_places: 2,
    },
    widget: Widget::Input {
        input_type: "number",
    },
};

pub const FIELDS: &[FieldSpec] = &[NAME, WEIGHT, WEIGHT_READY, PRICE];

pub fn clean(raw: &RawForm) -> Result<IngredientFields, FormErrors> {
    let mut cleaner = Cleaner::new(raw);
    let name = cleaner.char(&NAME);
    let weight = cleaner.positive_integer(&WEIGHT);
    let weight_ready = cleaner.positive_integer(&WEIGHT_READY);
    let price = cleaner.decimal(&PRICE);
    match (name, weight, weight_ready, price) {
        (Some(name), Some(weight), Some(weight_ready), Some(price)) if cleaner.is_valid() => {
            Ok(IngredientFields {
                name,
                weight,
                weight_ready,
                price,
            })
        }
        _ => Err(cleaner.into_errors()),
    }
}

/// Form data pre-filled from an existing ingredient.
pub fn initial(fields: &IngredientFields) -> RawForm {
    RawForm::from_pairs([
        (NAME.name, fields.name.clone()),
        (WEIGHT.name, fields.weight.to_string()),
        (WEIGHT_READY.name, fields.weight_ready.to_string()),
        (PRICE.name, format_price(&fields.price)),
    ])
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn cleans_a_valid_ingredient() {
        let raw = RawForm::from_pairs([
            ("name", "Egg"),
            ("weight", "10"),
            ("weight_ready", "10"),
            ("price", "10.00"),
        ]);
        let fields = clean(&raw).unwrap();
        assert_eq!(fields.name, "Egg");
        assert_eq!(fields.weight, 10);
        assert_eq!(fields.price, Decimal::new(1000, 2));
        assert_eq!(initial(&fields), raw);
    }

    #[test]
    fn reports_every_bad_field() {
        let raw = RawForm::from_pairs([("weight", "-3"), ("weight_ready", "x"), ("price", "1.234")]);
        let errors = clean(&raw).unwrap_err();
        assert_eq!(errors.field("name"), [super::super::REQUIRED]);
        assert_eq!(errors.field("weight").len(), 1);
        assert_eq!(errors.field("weight_ready"), ["Enter a whole number."]);
        assert_eq!(
            errors.field("price"),
            ["Ensure that there are no more than 2 decimal places."]
        );
    }
}
