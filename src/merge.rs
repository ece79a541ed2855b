//! Combining flags declared independently under the same name.
//!
//! Two subsystems may each declare `log.level` on their own flag set. Merging
//! makes them one logical flag: a `set` fans out to both cells, while reads
//! report a value only while both cells agree.
//!
//! - [`combine_flags`] merges two flags into a third one.
//! - [`merge_into`] declares flags on a scratch set and folds them into a
//!   target, combining on collision.
//! - [`combine_sets`] builds a new set routing writes back to two shared sets.
//! - [`subset`] and [`copy`] are the collision-free counterparts.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::FlagError;
use crate::flagset::{ErrorHandling, Flag, FlagSet};
use crate::flatten::join;
use crate::value::{OverrideSet, ValuePair, ValueRef};

/// Default way of joining two different usage strings of a merged flag.
pub fn default_merge_usage(_name: &str, usage0: &str, usage1: &str) -> String {
    format!("{usage0} / {usage1}")
}

fn merge_usage(
    name: &str,
    usage0: &str,
    usage1: &str,
    join_usage: &dyn Fn(&str, &str, &str) -> String,
) -> String {
    if usage0.is_empty() {
        usage1.to_string()
    } else if usage1.is_empty() || usage0 == usage1 {
        usage0.to_string()
    } else {
        join_usage(name, usage0, usage1)
    }
}

/// Combine two flags with the same name. See [`combine_flags_with`].
pub fn combine_flags(f0: &Flag, f1: &Flag) -> Flag {
    combine_flags_with(f0, f1, &default_merge_usage)
}

/// Combine two flags with the same name into a third one whose `set` drives
/// both cells. The sets the originals live in are not told about such writes.
///
/// The default of the result is the common default, or empty when the two
/// defaults differ. No kind check is made: a string flag may be combined with
/// an integer one, in which case typed reads never agree.
///
/// # Panics
///
/// Panics if the names differ. Merging unrelated flags is a static
/// misconfiguration, not a runtime condition.
pub fn combine_flags_with(
    f0: &Flag,
    f1: &Flag,
    join_usage: &dyn Fn(&str, &str, &str) -> String,
) -> Flag {
    if f0.name != f1.name {
        panic!(
            "flaglayer: can't combine flags with different names: {:?} vs {:?}",
            f0.name, f1.name
        );
    }
    let default = if f0.default == f1.default {
        f0.default.clone()
    } else {
        String::new()
    };
    Flag {
        name: f0.name.clone(),
        usage: merge_usage(&f0.name, &f0.usage, &f1.usage, join_usage),
        default,
        value: Rc::new(RefCell::new(ValuePair(f0.value.clone(), f1.value.clone()))),
    }
}

/// Declare flags with `setup` on a scratch set and fold them into `target`.
///
/// New names are added as they are. A name that already exists is replaced
/// by the combination of the existing and the new flag, so writes reach both
/// cells from then on.
pub fn merge_into(target: &mut FlagSet, setup: impl FnOnce(&mut FlagSet)) {
    merge_into_with(target, setup, &default_merge_usage)
}

pub fn merge_into_with(
    target: &mut FlagSet,
    setup: impl FnOnce(&mut FlagSet),
    join_usage: &dyn Fn(&str, &str, &str) -> String,
) {
    let mut scratch = FlagSet::new("", ErrorHandling::Continue);
    setup(&mut scratch);
    for next in scratch.flags() {
        let merged = match target.lookup(&next.name) {
            Some(prev) => combine_flags_with(prev, next, join_usage),
            None => next.clone(),
        };
        target.replace(merged);
    }
}

/// Register every flag of `src` in `dst`, sharing cells.
pub fn copy(dst: &mut FlagSet, src: &FlagSet) -> Result<(), FlagError> {
    for flag in src.flags() {
        dst.insert(flag.clone())?;
    }
    Ok(())
}

/// Declare flags with `setup` on a fresh set and register them in `target`
/// under `prefix.<name>`. Fails on the first name already present.
pub fn subset(
    target: &mut FlagSet,
    prefix: &str,
    setup: impl FnOnce(&mut FlagSet),
) -> Result<(), FlagError> {
    let mut sub = FlagSet::new(prefix, ErrorHandling::Continue);
    setup(&mut sub);
    for flag in sub.flags() {
        target.insert(Flag {
            name: join(prefix, &flag.name),
            ..flag.clone()
        })?;
    }
    Ok(())
}

/// Build a new set over two shared sets.
///
/// A name present in both becomes a combined flag whose `set` writes to
/// `fs0` and then to `fs1`. A failure in the second write is reported but the
/// first write is not rolled back. Names present in one set only write to
/// that set. Writes go through the original sets, so they are recorded as
/// set there.
pub fn combine_sets(fs0: &Rc<RefCell<FlagSet>>, fs1: &Rc<RefCell<FlagSet>>) -> FlagSet {
    let mut combined = FlagSet::new("", ErrorHandling::Continue);
    let left: Vec<Flag> = fs0.borrow().flags().cloned().collect();
    let right: Vec<Flag> = fs1.borrow().flags().cloned().collect();

    for f0 in &left {
        let f1 = fs1.borrow().lookup(&f0.name).cloned();
        let base = match &f1 {
            Some(f1) => combine_flags(f0, f1),
            None => f0.clone(),
        };
        let sets: Vec<Rc<RefCell<FlagSet>>> = match f1 {
            Some(_) => vec![fs0.clone(), fs1.clone()],
            None => vec![fs0.clone()],
        };
        combined.replace(routed(base, sets));
    }
    for f1 in right {
        if combined.lookup(&f1.name).is_some() {
            continue;
        }
        combined.replace(routed(f1, vec![fs1.clone()]));
    }
    combined
}

/// Wrap `flag` so that setting it sets the same name on each of `sets`.
fn routed(flag: Flag, sets: Vec<Rc<RefCell<FlagSet>>>) -> Flag {
    let name = flag.name.clone();
    let value: ValueRef = Rc::new(RefCell::new(OverrideSet::new(
        flag.value.clone(),
        move |s: &str| {
            for fs in &sets {
                fs.borrow_mut().set(&name, s)?;
            }
            Ok(())
        },
    )));
    Flag { value, ..flag }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use crate::value::{FlagValue, IntValue, StringValue};

    fn string_flag(name: &str, default: &str, usage: &str) -> Flag {
        Flag::new(
            name,
            usage,
            Rc::new(RefCell::new(StringValue(default.to_string()))),
        )
    }

    #[test]
    #[should_panic(expected = "can't combine flags with different names")]
    fn different_names_panic() {
        combine_flags(
            &string_flag("foo", "def", "desc#0"),
            &string_flag("bar", "def", "desc#1"),
        );
    }

    #[test]
    fn different_defaults_leave_default_blank() {
        let f = combine_flags(
            &string_flag("foo", "def#0", "desc#0"),
            &string_flag("foo", "def#1", "desc#1"),
        );
        assert_eq!(f.default, "");
        assert_eq!(f.usage, "desc#0 / desc#1");
    }

    #[test]
    fn same_default_is_kept() {
        let f = combine_flags(
            &string_flag("foo", "def", "desc#0"),
            &string_flag("foo", "def", "desc#1"),
        );
        assert_eq!(f.default, "def");
    }

    #[test]
    fn usage_merging_rules() {
        let join = |a: &str, b: &str| {
            combine_flags(&string_flag("x", "", a), &string_flag("x", "", b)).usage
        };
        assert_eq!(join("", "only"), "only");
        assert_eq!(join("only", ""), "only");
        assert_eq!(join("same", "same"), "same");
        assert_eq!(join("a", "b"), "a / b");
    }

    #[test]
    fn custom_usage_join() {
        let f = combine_flags_with(
            &string_flag("x", "", "a"),
            &string_flag("x", "", "b"),
            &|name, a, b| format!("{name}: {a} | {b}"),
        );
        assert_eq!(f.usage, "x: a | b");
    }

    #[test]
    fn set_reaches_both_and_divergence_is_reported() {
        let a = string_flag("foo", "", "");
        let b = string_flag("foo", "", "");
        let merged = combine_flags(&a, &b);
        merged.value.borrow_mut().set("7f3a").unwrap();
        assert_eq!(a.current(), "7f3a");
        assert_eq!(b.current(), "7f3a");
        assert_eq!(merged.current(), "7f3a");

        a.value.borrow_mut().set("left").unwrap();
        assert_eq!(merged.current(), "");
        assert_eq!(merged.value.borrow().get(), None);
    }

    #[test]
    fn merge_into_combines_three_declarations() {
        let mut fs = FlagSet::new("superset", ErrorHandling::Panic);
        let s0 = fs.string("foo", "bar", "superset usage").unwrap();
        let mut s1 = None;
        let mut s2 = None;
        merge_into(&mut fs, |sub| {
            s1 = Some(sub.string("foo", "baz", "subset1 usage").unwrap());
        });
        merge_into(&mut fs, |sub| {
            s2 = Some(sub.string("foo", "baq", "subset2 usage").unwrap());
        });
        let (s1, s2) = (s1.unwrap(), s2.unwrap());
        assert_ne!(s0.borrow().value(), s1.borrow().value());

        fs.set("foo", "42").unwrap();
        assert_eq!(s0.borrow().value(), "42");
        assert_eq!(s1.borrow().value(), "42");
        assert_eq!(s2.borrow().value(), "42");

        let flag = fs.lookup("foo").unwrap();
        assert_eq!(flag.current(), "42");
        assert_eq!(
            flag.usage,
            "superset usage / subset1 usage / subset2 usage"
        );
    }

    #[test]
    fn merge_into_different_kinds() {
        let mut fs = FlagSet::default();
        let s = fs.string("foo", "42", "some flag").unwrap();
        let mut i = None;
        merge_into(&mut fs, |sub| {
            i = Some(sub.int("foo", 84, "another flag").unwrap());
        });
        let i = i.unwrap();
        fs.set("foo", "34").unwrap();
        assert_eq!(s.borrow().value(), "34");
        assert_eq!(i.borrow().value(), 34);
        assert_eq!(fs.lookup("foo").unwrap().value.borrow().get(), None);
    }

    #[test]
    fn merge_into_adds_new_names() {
        let mut fs = FlagSet::default();
        merge_into(&mut fs, |sub| {
            sub.bool("fresh", true, "new").unwrap();
        });
        assert_eq!(fs.lookup("fresh").unwrap().current(), "true");
    }

    #[test]
    fn combine_sets_routes_writes() {
        let fs0 = Rc::new(RefCell::new(FlagSet::new("FlagSet#0", ErrorHandling::Continue)));
        let fs1 = Rc::new(RefCell::new(FlagSet::new("FlagSet#1", ErrorHandling::Continue)));
        fs0.borrow_mut().string("first", "first-default", "").unwrap();
        fs0.borrow_mut().string("both", "both-default-0", "").unwrap();
        fs1.borrow_mut().string("both", "both-default-1", "").unwrap();
        fs1.borrow_mut().string("second", "second-default", "").unwrap();

        let mut fs = combine_sets(&fs0, &fs1);

        assert!(fs.lookup("whoa").is_none());
        assert_eq!(fs.lookup("first").unwrap().current(), "first-default");
        assert_eq!(fs.lookup("second").unwrap().current(), "second-default");
        assert_eq!(fs.lookup("both").unwrap().current(), "");
        assert!(fs.set("whoa", "want error").is_err());

        fs.set("first", "first").unwrap();
        assert_eq!(fs.lookup("first").unwrap().current(), "first");
        assert_eq!(fs0.borrow().lookup("first").unwrap().current(), "first");
        assert!(fs0.borrow().is_set("first"));

        fs.set("second", "second").unwrap();
        assert_eq!(fs1.borrow().lookup("second").unwrap().current(), "second");

        fs.set("both", "both").unwrap();
        assert_eq!(fs.lookup("both").unwrap().current(), "both");
        assert_eq!(fs0.borrow().lookup("both").unwrap().current(), "both");
        assert_eq!(fs1.borrow().lookup("both").unwrap().current(), "both");
        assert!(fs0.borrow().is_set("both"));
        assert!(fs1.borrow().is_set("both"));
    }

    #[test]
    fn combine_sets_keeps_first_write_on_second_failure() {
        let fs0 = Rc::new(RefCell::new(FlagSet::default()));
        let fs1 = Rc::new(RefCell::new(FlagSet::default()));
        fs0.borrow_mut().string("n", "", "").unwrap();
        fs1.borrow_mut().int("n", 0, "").unwrap();

        let mut fs = combine_sets(&fs0, &fs1);
        let err = fs.set("n", "not-a-number").unwrap_err();
        assert!(matches!(err, FlagError::InvalidValue { .. }));
        assert_eq!(fs0.borrow().lookup("n").unwrap().current(), "not-a-number");
        assert_eq!(fs1.borrow().lookup("n").unwrap().current(), "0");
    }

    #[test]
    fn subset_prefixes_names() {
        let mut fs = FlagSet::default();
        subset(&mut fs, "db", |sub| {
            sub.string("url", "pg://", "database url").unwrap();
        })
        .unwrap();
        let flag = fs.lookup("db.url").unwrap();
        assert_eq!(flag.current(), "pg://");
        assert_eq!(flag.usage, "database url");
    }

    #[test]
    fn subset_rejects_collisions() {
        let mut fs = FlagSet::default();
        fs.string("db.url", "", "").unwrap();
        let err = subset(&mut fs, "db", |sub| {
            sub.string("url", "", "").unwrap();
        })
        .unwrap_err();
        assert!(matches!(err, FlagError::Redefined { name } if name == "db.url"));
    }

    #[test]
    fn copy_shares_cells() {
        let mut src = FlagSet::default();
        let n = src.define("n", IntValue(1), "").unwrap();
        let mut dst = FlagSet::default();
        copy(&mut dst, &src).unwrap();
        dst.set("n", "5").unwrap();
        assert_eq!(n.borrow().value(), 5);
        assert_eq!(dst.lookup("n").unwrap().value.borrow().get(), Some(Node::I64(5)));
    }
}
