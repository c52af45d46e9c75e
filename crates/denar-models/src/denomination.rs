//! Macedonian denar denominations and their spoken names.

use crate::currency::CurrencyType;

/// A denomination known to the specific models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Denomination {
    /// Model class label, e.g. `100_note`
    pub class_name: &'static str,
    pub value: u32,
    pub currency_type: CurrencyType,
    /// Spoken Macedonian name
    pub name_mk: &'static str,
    /// Spoken English name
    pub name_en: &'static str,
}

const fn note(class_name: &'static str, value: u32, name_mk: &'static str, name_en: &'static str) -> Denomination {
    Denomination {
        class_name,
        value,
        currency_type: CurrencyType::Note,
        name_mk,
        name_en,
    }
}

const fn coin(class_name: &'static str, value: u32, name_mk: &'static str, name_en: &'static str) -> Denomination {
    Denomination {
        class_name,
        value,
        currency_type: CurrencyType::Coin,
        name_mk,
        name_en,
    }
}

/// All denominations recognised by the banknote and coin models.
pub const DENOMINATIONS: &[Denomination] = &[
    note("2000_note", 2000, "две илјади денари", "two thousand denars"),
    note("1000_note", 1000, "илјада денари", "one thousand denars"),
    note("500_note", 500, "петстотини денари", "five hundred denars"),
    note("200_note", 200, "двесте денари", "two hundred denars"),
    note("100_note", 100, "сто денари", "one hundred denars"),
    note("50_note", 50, "педесет денари", "fifty denars"),
    note("10_note", 10, "десет денари", "ten denars"),
    coin("50_coin", 50, "педесет денари", "fifty denars"),
    coin("10_coin", 10, "десет денари", "ten denars"),
    coin("5_coin", 5, "пет денари", "five denars"),
    coin("2_coin", 2, "два денари", "two denars"),
    coin("1_coin", 1, "еден денар", "one denar"),
];

impl Denomination {
    /// Look up a denomination by model class label.
    pub fn from_class_name(class_name: &str) -> Option<&'static Denomination> {
        let class_name = class_name.trim();
        DENOMINATIONS
            .iter()
            .find(|d| d.class_name.eq_ignore_ascii_case(class_name))
    }
}
