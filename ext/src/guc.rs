use std::ffi::CString;

use pgrx::guc::*;
use tabledeps_core::CaseSensitivity;

pub static SCHEMA: GucSetting<Option<CString>> =
    GucSetting::<Option<CString>>::new(Some(c"public"));

pub static CASE_SENSITIVE: GucSetting<bool> = GucSetting::<bool>::new(true);

/// Read a string GUC, returning None if unset or empty.
pub fn get_string(setting: &GucSetting<Option<CString>>) -> Option<String> {
    setting
        .get()
        .and_then(|cs| cs.into_string().ok())
        .filter(|s| !s.is_empty())
}

/// Schema whose tables are searched. Falls back to `public` when cleared.
pub fn schema() -> String {
    get_string(&SCHEMA).unwrap_or_else(|| "public".to_string())
}

pub fn case_sensitivity() -> CaseSensitivity {
    if CASE_SENSITIVE.get() {
        CaseSensitivity::Sensitive
    } else {
        CaseSensitivity::Insensitive
    }
}

pub fn register_gucs() {
    GucRegistry::define_string_guc(
        c"tabledeps.schema",
        c"Schema searched for tables and foreign keys",
        c"Foreign keys are followed only between tables of this schema.",
        &SCHEMA,
        GucContext::Userset,
        GucFlags::default(),
    );

    GucRegistry::define_bool_guc(
        c"tabledeps.case_sensitive",
        c"Match table names exactly",
        c"When false, table names given to tabledeps functions are matched ignoring ASCII case.",
        &CASE_SENSITIVE,
        GucContext::Userset,
        GucFlags::default(),
    );
}
