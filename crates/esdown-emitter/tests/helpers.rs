use super::*;
use crate::error::ErrorKind;
use crate::transforms::ir_printer::IRPrinter;

#[test]
fn test_catalog_lookup() {
    let spec = lookup_helper("create_class").unwrap();
    assert_eq!(spec.min_args, 2);
    assert_eq!(spec.max_args, 3);
    assert!(lookup_helper("ts_values").is_some());
    assert!(lookup_helper("object_spread").is_none());
}

#[test]
fn test_require_records_first_use_order() {
    let mut registry = HelperRegistry::new();
    registry.require("ts_generator").unwrap();
    registry.require("async_to_generator").unwrap();
    registry.require("ts_generator").unwrap();

    assert_eq!(
        registry.required_helpers(),
        vec!["ts_generator", "async_to_generator"]
    );
    assert_eq!(registry.len(), 2);
    assert!(registry.is_required("async_to_generator"));
    assert!(!registry.is_required("inherits"));
}

#[test]
fn test_require_unknown_helper_fails() {
    let mut registry = HelperRegistry::new();
    let err = registry.require("no_such_helper").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HelperResolution);
    assert_eq!(
        err,
        LowerError::Helper(HelperError::Unknown("no_such_helper".to_string()))
    );
    assert!(registry.is_empty());
}

#[test]
fn test_handle_call_checks_arity() {
    let mut registry = HelperRegistry::new();
    let check = registry.require("class_call_check").unwrap();
    assert_eq!(check.name(), "class_call_check");
    assert_eq!(check.local_name(), "_class_call_check");

    let call = check
        .call(vec![IRNode::this(), IRNode::id("C")])
        .unwrap();
    assert_eq!(IRPrinter::emit_to_string(&call), "_class_call_check(this, C)");

    let err = check.call(vec![IRNode::this()]).unwrap_err();
    assert!(matches!(
        err,
        LowerError::Helper(HelperError::Arity {
            name: "class_call_check",
            min: 2,
            max: 2,
            got: 1
        })
    ));
}

#[test]
fn test_create_class_accepts_optional_statics() {
    let mut registry = HelperRegistry::new();
    let create_class = registry.require("create_class").unwrap();
    assert!(create_class.call(vec![IRNode::id("C"), IRNode::array(vec![])]).is_ok());
    assert!(
        create_class
            .call(vec![IRNode::id("C"), IRNode::array(vec![]), IRNode::array(vec![])])
            .is_ok()
    );
    assert!(create_class.call(vec![IRNode::id("C")]).is_err());
}

#[test]
fn test_truncate_forgets_later_helpers() {
    let mut registry = HelperRegistry::new();
    registry.require("inherits").unwrap();
    let mark = registry.len();
    registry.require("create_super").unwrap();
    registry.truncate(mark);
    assert_eq!(registry.required_helpers(), vec!["inherits"]);
}

#[test]
fn test_import_statements_follow_options() {
    let mut registry = HelperRegistry::new();
    registry.require("inherits").unwrap();
    registry.require("create_super").unwrap();

    let imports = registry.import_statements(&EmitOptions::default());
    assert_eq!(
        imports,
        vec![
            IRNode::DefaultImport {
                local: "_inherits".to_string(),
                source: "@swc/helpers/src/_inherits.mjs".to_string(),
            },
            IRNode::DefaultImport {
                local: "_create_super".to_string(),
                source: "@swc/helpers/src/_create_super.mjs".to_string(),
            },
        ]
    );

    let options = EmitOptions {
        helper_import_style: HelperImportStyle::CommonJs,
        helper_module_prefix: "tslib-helpers/".to_string(),
        helper_module_extension: String::new(),
        ..EmitOptions::default()
    };
    let imports = registry.import_statements(&options);
    assert_eq!(
        imports[0],
        IRNode::RequireStatement {
            local: "_inherits".to_string(),
            source: "tslib-helpers/_inherits".to_string(),
        }
    );
}

#[test]
fn test_empty_registry_has_no_imports() {
    let registry = HelperRegistry::new();
    assert!(registry.import_statements(&EmitOptions::default()).is_empty());
}
