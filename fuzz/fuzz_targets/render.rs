#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use dotfacade::facade::render::{render, substitute_generic_arity};
use dotfacade::metadata::types::{TypeFlavor, TypeRef};

fuzz_target!(|data: &[u8]| {
    if let Ok(raw) = std::str::from_utf8(data) {
        let args = vec![
            Arc::new(TypeRef::primitive(TypeFlavor::I4)),
            Arc::new(TypeRef::primitive(TypeFlavor::String)),
        ];
        let _ = substitute_generic_arity(raw, &args, render);
        let _ = render(&TypeRef::class("Fuzz", raw));
    }
});
