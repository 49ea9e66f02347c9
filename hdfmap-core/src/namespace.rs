//! Scannable and combined namespace derivation.

use crate::address::{child_address, name_from_address};
use crate::hierarchy::Hierarchy;
use crate::map::{HdfMap, Namespace, Pass};

impl HdfMap {
    /// Rebuild `combined` from `values`, `arrays` and `scannables`, later
    /// namespaces winning on shared names.
    pub fn generate_combined(&mut self) {
        let mut combined = self.values.clone();
        for (name, address) in self.arrays.iter().chain(self.scannables.iter()) {
            combined.insert(name.clone(), address.clone());
        }
        self.combined = combined;
    }

    /// Make every array with `size` elements a scannable.
    pub fn generate_scannables(&mut self, size: usize) {
        self.scannables = self
            .arrays
            .iter()
            .filter(|(_, address)| self.datasets.get(*address).is_some_and(|d| d.size == size))
            .map(|(name, address)| (name.clone(), address.clone()))
            .collect();
        debug_log!(
            self.config.debug,
            "scannables of size {size}: {:?}",
            self.scannables.keys().collect::<Vec<_>>()
        );
        self.generate_combined();
    }

    /// Derive scannables from the datasets directly inside a group.
    ///
    /// The size of the first dataset in the group is the reference size.
    /// The group is walked without recursion, recording its members under
    /// `address_override` when given (soft-linked members included), and
    /// every member dataset of the reference size becomes a scannable.
    pub fn generate_scannables_from_group(
        &mut self,
        file: &dyn Hierarchy,
        group_address: &str,
        address_override: Option<&str>,
    ) {
        let target = address_override.unwrap_or(group_address);
        let members: Vec<(String, usize)> = file
            .children(group_address)
            .into_iter()
            .filter_map(|child| {
                let info = file.dataset_info(&child_address(group_address, &child.name))?;
                Some((child.name, info.size()))
            })
            .collect();
        self.traverse(
            file,
            Pass {
                source: group_address,
                target,
                recursive: false,
                groups: None,
                include_soft: true,
                link_depth: 0,
            },
        );
        let mut scannables = Namespace::new();
        if let Some(&(_, size)) = members.first() {
            for (key, _) in members.iter().filter(|(_, s)| *s == size) {
                scannables.insert(name_from_address(key), child_address(target, key));
            }
        }
        debug_log!(
            self.config.debug,
            "scannables from group {target}: {:?}",
            scannables.keys().collect::<Vec<_>>()
        );
        self.scannables = scannables;
        self.generate_combined();
    }

    /// Derive scannables from candidate names or addresses.
    ///
    /// Candidates are converted to names and looked up in `arrays`; the
    /// first match sets the reference size. No match leaves `scannables`
    /// empty.
    pub fn generate_scannables_from_names<S: AsRef<str>>(&mut self, names: &[S]) {
        let candidates: Vec<String> = names
            .iter()
            .map(|n| name_from_address(n.as_ref()))
            .filter(|n| self.arrays.contains_key(n))
            .collect();
        debug_log!(self.config.debug, "scannables from names: {candidates:?}");
        let size_of = |name: &String| {
            self.arrays
                .get(name)
                .and_then(|address| self.datasets.get(address))
                .map(|d| d.size)
        };
        let reference = candidates.first().and_then(|name| size_of(name));
        let scannables: Namespace = candidates
            .iter()
            .filter(|name| reference.is_some() && size_of(*name) == reference)
            .filter_map(|name| Some((name.clone(), self.arrays.get(name)?.clone())))
            .collect();
        self.scannables = scannables;
        self.generate_combined();
    }
}

#[cfg(test)]
mod tests {
    use crate::hierarchy::Hierarchy;
    use crate::map::HdfMap;
    use crate::memory::MemoryFile;

    fn file() -> MemoryFile {
        let mut file = MemoryFile::new();
        file.dataset("/entry/measurement/x", vec![1.0, 2.0, 3.0]);
        file.dataset("/entry/measurement/y", vec![1_i64, 2, 3]);
        file.dataset("/entry/measurement/roi", vec![1.0, 2.0]);
        file.dataset("/entry/before/x", 0.5);
        file.dataset("/entry/other/z", vec![9.0, 8.0, 7.0]);
        file
    }

    #[test]
    fn test_combined_precedence() {
        let mut map = HdfMap::new();
        map.values.insert("x".into(), "/value/x".into());
        map.arrays.insert("x".into(), "/array/x".into());
        map.generate_combined();
        assert_eq!(map.combined()["x"], "/array/x");
        map.scannables.insert("x".into(), "/scan/x".into());
        map.generate_combined();
        assert_eq!(map.combined()["x"], "/scan/x");
    }

    #[test]
    fn test_generate_scannables() {
        let mut map = HdfMap::new();
        map.populate(&file());
        map.generate_scannables(3);
        let names: Vec<&String> = map.scannables().keys().collect();
        assert_eq!(names, vec!["x", "y", "z"]);
        assert_eq!(map.scannables_length(), 3);
        assert_eq!(map.combined()["x"], "/entry/measurement/x");
        assert_eq!(map.combined()["roi"], "/entry/measurement/roi");
    }

    #[test]
    fn test_scannables_from_group() {
        let mut file = file();
        file.soft_link("/entry/measurement/link", "/entry/other/z");
        let mut map = HdfMap::new();
        map.populate(&file);
        map.generate_scannables_from_group(&file, "/entry/measurement", None);
        let names: Vec<&String> = map.scannables().keys().collect();
        assert_eq!(names, vec!["x", "y", "link"]);
        assert_eq!(map.scannables()["link"], "/entry/measurement/link");
        assert!(map.datasets().contains_key("/entry/measurement/link"));
        assert!(file.contains(&map.scannables()["link"]));
    }

    #[test]
    fn test_scannables_from_group_with_override() {
        let file = file();
        let mut map = HdfMap::new();
        map.generate_scannables_from_group(&file, "/entry/measurement", Some("/entry/alias"));
        assert_eq!(map.scannables()["x"], "/entry/alias/x");
        assert!(map.datasets().contains_key("/entry/alias/x"));
    }

    #[test]
    fn test_scannables_from_names() {
        let mut map = HdfMap::new();
        map.populate(&file());
        map.generate_scannables_from_names(&["/entry/measurement/roi", "x", "missing"]);
        let names: Vec<&String> = map.scannables().keys().collect();
        assert_eq!(names, vec!["roi"]);
        map.generate_scannables_from_names(&["missing"]);
        assert!(map.scannables().is_empty());
    }
}
