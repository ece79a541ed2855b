#[cfg(test)]
pub mod test {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::error::FlagError;
    use crate::flagset::{ErrorHandling, FlagSet};
    use crate::view::FlagSetView;

    /// `bar: bool`, `foo: string`, `labels: map`, `port: int`, `tags: list`.
    pub fn sample_flags() -> FlagSet {
        let mut fs = FlagSet::new("test", ErrorHandling::Continue);
        fs.string("foo", "", "foo value").unwrap();
        fs.bool("bar", false, "bar toggle").unwrap();
        fs.int("port", 8080, "port to listen on").unwrap();
        fs.list("tags", "repeatable tag").unwrap();
        fs.map("labels", "key:value labels").unwrap();
        fs
    }

    /// Flag set with string flags named `names`, plus a `bool` flag for each
    /// name in `bools`.
    pub fn flags_named(names: &[&str], bools: &[&str]) -> FlagSet {
        let mut fs = FlagSet::new("test", ErrorHandling::Continue);
        for name in names {
            fs.string(name, "", "").unwrap();
        }
        for name in bools {
            fs.bool(name, false, "").unwrap();
        }
        fs
    }

    /// Records every successful `set` that reaches the registry, in order.
    pub fn recording(fs: &mut FlagSet) -> Rc<RefCell<Vec<(String, String)>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let names: Vec<String> = fs.flags().map(|f| f.name.clone()).collect();
        for name in names {
            let Some(flag) = fs.lookup(&name).cloned() else {
                continue;
            };
            let log = log.clone();
            let inner = flag.value.clone();
            let name_for_log = name.clone();
            let value = crate::value::OverrideSet::new(flag.value.clone(), move |s: &str| {
                inner.borrow_mut().set(s)?;
                log.borrow_mut().push((name_for_log.clone(), s.to_string()));
                Ok(())
            });
            fs.replace(crate::flagset::Flag {
                value: Rc::new(RefCell::new(value)),
                ..flag
            });
        }
        log
    }

    pub fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
        expected
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// In-memory writer whose contents stay readable after being handed out
    /// as a `Box<dyn Write>`.
    #[derive(Clone, Default)]
    pub struct SharedBuf(pub Rc<RefCell<Vec<u8>>>);

    impl SharedBuf {
        pub fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.borrow()).into_owned()
        }
    }

    impl std::io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Run `parse` against a fresh view of `fs`.
    pub fn with_view<T>(
        fs: &mut FlagSet,
        parse: impl FnOnce(&mut FlagSetView<'_>) -> Result<T, FlagError>,
    ) -> Result<T, FlagError> {
        let mut view = FlagSetView::new(fs);
        parse(&mut view)
    }

    #[test]
    fn sample_flags_are_all_unset() {
        let fs = sample_flags();
        assert_eq!(fs.len(), 5);
        let mut set = 0;
        fs.visit(|_| set += 1);
        assert_eq!(set, 0);
    }

    #[test]
    fn recording_sees_sets_in_order() {
        let mut fs = flags_named(&["a", "b"], &[]);
        let log = recording(&mut fs);
        fs.set("b", "1").unwrap();
        fs.set("a", "2").unwrap();
        assert_eq!(*log.borrow(), pairs(&[("b", "1"), ("a", "2")]));
        assert_eq!(fs.lookup("a").unwrap().current(), "2");
    }
}
