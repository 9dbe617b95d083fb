#![no_main]

use libfuzzer_sys::fuzz_target;
use dotfacade::facade::literal::render_default;
use dotfacade::metadata::literal::Literal;
use dotfacade::metadata::types::{TypeFlavor, TypeRef};

fuzz_target!(|data: &[u8]| {
    if let Some((&element_type, blob)) = data.split_first() {
        if let Ok(literal) = Literal::from_constant(element_type, blob) {
            let _ = render_default(&literal, &TypeRef::primitive(TypeFlavor::Object), "M(x)");
        }
    }
});
