//! Structural checks on a loaded package, run before any emission.

use std::collections::HashMap;

use super::argument::ArgNode;
use super::compound::CompoundKind;
use super::ident::Ident;
use super::package::{OptionArg, OptionDef, Package};
use crate::error::CoreError;

/// Check a package for problems the templates cannot recover from.
///
/// All problems are collected and reported together in one
/// [`CoreError::Invalid`].
pub fn validate_package(package: &Package) -> Result<(), CoreError> {
    let mut problems = Vec::new();

    check_ident(&package.ident, "package", &mut problems);
    for method in &package.methods {
        check_ident(&method.ident, "method", &mut problems);
        // Ids of all options share one enum, so distinct idents must not
        // collapse onto the same generated id anywhere in the method.
        let mut constants: HashMap<String, Ident> = HashMap::new();
        for option in &method.options {
            let scope = format!("{}.{}", method.ident, option.ident);
            check_ident(&option.ident, "option", &mut problems);
            check_option(option, &scope, &mut constants, &mut problems);
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(CoreError::Invalid {
            message: problems.join("; "),
        })
    }
}

fn check_ident(ident: &Ident, what: &str, problems: &mut Vec<String>) {
    if !ident.is_valid() {
        problems.push(format!("{what} ident `{ident}` is not a valid identifier"));
    }
}

fn check_option(
    option: &OptionDef,
    scope: &str,
    constants: &mut HashMap<String, Ident>,
    problems: &mut Vec<String>,
) {
    let outputs = option
        .arguments()
        .filter(|arg| matches!(arg, ArgNode::Output(_)))
        .count();
    if outputs > 1 {
        problems.push(format!(
            "{scope}: {outputs} outputs, but the native call has a single return value"
        ));
    }

    for item in &option.args {
        if let OptionArg::Compound(compound) = item {
            if compound.kind == CompoundKind::Size && compound.args.len() != 2 {
                problems.push(format!(
                    "{scope}: size compound `{}` needs exactly 2 arguments, got {}",
                    compound.label(),
                    compound.args.len()
                ));
            }
        }
    }

    for arg in option.arguments() {
        let ident = arg.ident();
        check_ident(ident, "argument", problems);

        match constants.get(&ident.constant()) {
            Some(seen) if seen != ident => problems.push(format!(
                "{scope}: `{seen}` and `{ident}` both map to id `{}`",
                ident.constant()
            )),
            Some(_) => {}
            None => {
                constants.insert(ident.constant(), ident.clone());
            }
        }

        match arg {
            ArgNode::RefInput(r) if option.resolve_ref(r).is_none() => {
                problems.push(format!(
                    "{scope}: `{ident}` references unknown argument `{}`",
                    r.ref_arg
                ));
            }
            ArgNode::NumericParameter(n) => {
                if let (Some(min), Some(max)) = (&n.min_value, &n.max_value) {
                    if let (Ok(lo), Ok(hi)) = (min.parse::<f64>(), max.parse::<f64>()) {
                        if lo > hi {
                            problems.push(format!(
                                "{scope}: `{ident}` has min {min} greater than max {max}"
                            ));
                        }
                    }
                }
            }
            ArgNode::EnumParameter(e) => {
                if e.descriptions.is_empty() {
                    problems.push(format!("{scope}: enum `{ident}` has no descriptions"));
                }
                for d in &e.descriptions {
                    check_ident(&d.ident, "enum description", problems);
                }
            }
            _ => {}
        }
    }
}
