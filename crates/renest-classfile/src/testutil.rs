//! Synthetic class-file assembly for tests.
//!
//! Builds small but structurally complete classes: real constant pool, a
//! configurable number of methods carrying `Code` attributes, and optional
//! `InnerClasses`/`EnclosingMethod` tables. Enabled via the `testutil`
//! feature so downstream crates' tests can share it.

use std::collections::HashMap;

#[derive(Default)]
struct PoolWriter {
    bytes: Vec<u8>,
    count: u16,
    utf8_cache: HashMap<String, u16>,
    class_cache: HashMap<String, u16>,
}

impl PoolWriter {
    fn utf8(&mut self, text: &str) -> u16 {
        if let Some(&i) = self.utf8_cache.get(text) {
            return i;
        }
        self.count += 1;
        self.bytes.push(1);
        self.bytes
            .extend_from_slice(&(text.len() as u16).to_be_bytes());
        self.bytes.extend_from_slice(text.as_bytes());
        self.utf8_cache.insert(text.to_owned(), self.count);
        self.count
    }

    fn class(&mut self, name: &str) -> u16 {
        if let Some(&i) = self.class_cache.get(name) {
            return i;
        }
        let name_index = self.utf8(name);
        self.count += 1;
        self.bytes.push(7);
        self.bytes.extend_from_slice(&name_index.to_be_bytes());
        self.class_cache.insert(name.to_owned(), self.count);
        self.count
    }
}

struct InnerRow {
    inner: String,
    outer: Option<String>,
    simple_name: Option<String>,
    flags: u16,
}

/// Declarative description of one synthetic class.
pub struct ClassSpec {
    name: String,
    super_name: String,
    access: u16,
    methods: usize,
    inner_rows: Vec<InnerRow>,
    enclosing: Option<(String, u16)>,
}

impl ClassSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            super_name: "java/lang/Object".to_owned(),
            access: 0x0021, // PUBLIC | SUPER
            methods: 1,
            inner_rows: Vec::new(),
            enclosing: None,
        }
    }

    #[must_use]
    pub fn access(mut self, access: u16) -> Self {
        self.access = access;
        self
    }

    #[must_use]
    pub fn methods(mut self, count: usize) -> Self {
        self.methods = count;
        self
    }

    #[must_use]
    pub fn inner_row(
        mut self,
        inner: &str,
        outer: Option<&str>,
        simple_name: Option<&str>,
        flags: u16,
    ) -> Self {
        self.inner_rows.push(InnerRow {
            inner: inner.to_owned(),
            outer: outer.map(str::to_owned),
            simple_name: simple_name.map(str::to_owned),
            flags,
        });
        self
    }

    #[must_use]
    pub fn enclosing(self, class: &str) -> Self {
        self.enclosing_with_method(class, 0)
    }

    #[must_use]
    pub fn enclosing_with_method(mut self, class: &str, method_index: u16) -> Self {
        self.enclosing = Some((class.to_owned(), method_index));
        self
    }

    /// Assemble the class bytes.
    pub fn build(&self) -> Vec<u8> {
        let mut pool = PoolWriter::default();

        let this_index = pool.class(&self.name);
        let super_index = pool.class(&self.super_name);

        let mut method_indices = Vec::new();
        let code_index = if self.methods > 0 {
            let code = pool.utf8("Code");
            for i in 0..self.methods {
                let name = pool.utf8(&format!("m{i}"));
                let desc = pool.utf8("()V");
                method_indices.push((name, desc));
            }
            code
        } else {
            0
        };

        let inner_attr_name = if self.inner_rows.is_empty() {
            0
        } else {
            pool.utf8("InnerClasses")
        };
        let encoded_rows: Vec<[u16; 4]> = self
            .inner_rows
            .iter()
            .map(|row| {
                [
                    pool.class(&row.inner),
                    row.outer.as_deref().map_or(0, |o| pool.class(o)),
                    row.simple_name.as_deref().map_or(0, |s| pool.utf8(s)),
                    row.flags,
                ]
            })
            .collect();
        let enclosing_encoded = self
            .enclosing
            .as_ref()
            .map(|(class, method)| (pool.utf8("EnclosingMethod"), pool.class(class), *method));

        let mut out = Vec::new();
        out.extend_from_slice(&0xCAFE_BABE_u32.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes()); // minor
        out.extend_from_slice(&52u16.to_be_bytes()); // major (Java 8)
        out.extend_from_slice(&(pool.count + 1).to_be_bytes());
        out.extend_from_slice(&pool.bytes);
        out.extend_from_slice(&self.access.to_be_bytes());
        out.extend_from_slice(&this_index.to_be_bytes());
        out.extend_from_slice(&super_index.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes()); // interfaces
        out.extend_from_slice(&0u16.to_be_bytes()); // fields

        out.extend_from_slice(&(self.methods as u16).to_be_bytes());
        for (name, desc) in &method_indices {
            out.extend_from_slice(&0x0001u16.to_be_bytes()); // ACC_PUBLIC
            out.extend_from_slice(&name.to_be_bytes());
            out.extend_from_slice(&desc.to_be_bytes());
            out.extend_from_slice(&1u16.to_be_bytes()); // one attribute
            out.extend_from_slice(&code_index.to_be_bytes());
            out.extend_from_slice(&13u32.to_be_bytes()); // attribute_length
            out.extend_from_slice(&0u16.to_be_bytes()); // max_stack
            out.extend_from_slice(&1u16.to_be_bytes()); // max_locals
            out.extend_from_slice(&1u32.to_be_bytes()); // code_length
            out.push(0xB1); // return
            out.extend_from_slice(&0u16.to_be_bytes()); // exception table
            out.extend_from_slice(&0u16.to_be_bytes()); // code attributes
        }

        let attr_count =
            u16::from(!encoded_rows.is_empty()) + u16::from(enclosing_encoded.is_some());
        out.extend_from_slice(&attr_count.to_be_bytes());

        if !encoded_rows.is_empty() {
            out.extend_from_slice(&inner_attr_name.to_be_bytes());
            let len = (2 + 8 * encoded_rows.len()) as u32;
            out.extend_from_slice(&len.to_be_bytes());
            out.extend_from_slice(&(encoded_rows.len() as u16).to_be_bytes());
            for row in &encoded_rows {
                for half in row {
                    out.extend_from_slice(&half.to_be_bytes());
                }
            }
        }

        if let Some((attr_name, class_index, method_index)) = enclosing_encoded {
            out.extend_from_slice(&attr_name.to_be_bytes());
            out.extend_from_slice(&4u32.to_be_bytes());
            out.extend_from_slice(&class_index.to_be_bytes());
            out.extend_from_slice(&method_index.to_be_bytes());
        }

        out
    }
}
