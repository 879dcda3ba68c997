//! Fluent localization

use std::sync::LazyLock;

use i18n_embed::{
    DefaultLocalizer, LanguageLoader, Localizer,
    fluent::{FluentLanguageLoader, fluent_language_loader},
};
use rust_embed::RustEmbed;

use crate::annotations::host::{Label, Translate};

#[derive(RustEmbed)]
#[folder = "i18n/"]
struct Localizations;

pub static LANGUAGE_LOADER: LazyLock<FluentLanguageLoader> = LazyLock::new(|| {
    let loader: FluentLanguageLoader = fluent_language_loader!();

    // Embedded at compile time, so this only fails on a broken build
    loader
        .load_fallback_language(&Localizations)
        .expect("Error while loading fallback language");

    loader
});

/// Look up a message of the active language
#[macro_export]
macro_rules! fl {
    ($message_id:literal) => {{
        i18n_embed_fl::fl!($crate::localize::LANGUAGE_LOADER, $message_id)
    }};

    ($message_id:literal, $($args:expr),*) => {{
        i18n_embed_fl::fl!($crate::localize::LANGUAGE_LOADER, $message_id, $($args), *)
    }};
}

pub fn localizer() -> Box<dyn Localizer> {
    Box::from(DefaultLocalizer::new(&*LANGUAGE_LOADER, &Localizations))
}

/// Select the languages requested by the desktop
pub fn localize() {
    let localizer = localizer();
    let requested_languages = i18n_embed::DesktopLanguageRequester::requested_languages();

    if let Err(error) = localizer.select(&requested_languages) {
        log::error!("Error while loading language for nodemap: {}", error);
    }
}

/// `Translate` backed by the fluent messages in `i18n/`
#[derive(Clone, Copy, Debug, Default)]
pub struct FluentTranslator;

impl Translate for FluentTranslator {
    fn translate(&self, label: Label) -> String {
        match label {
            Label::CustomNode => crate::fl!("custom-node"),
            Label::MenuHint => crate::fl!("menu-hint"),
            Label::SetDiscovered => crate::fl!("set-discovered"),
            Label::SetUndiscovered => crate::fl!("set-undiscovered"),
            Label::EditCustomNode => crate::fl!("edit-custom-node"),
            Label::FieldTitle => crate::fl!("field-title"),
            Label::FieldDescription => crate::fl!("field-description"),
            Label::FieldColor => crate::fl!("field-color"),
            Label::FieldIcon => crate::fl!("field-icon"),
            Label::Save => crate::fl!("save"),
            Label::Delete => crate::fl!("delete"),
            Label::Cancel => crate::fl!("cancel"),
            Label::DragHint => crate::fl!("drag-hint"),
        }
    }
}
