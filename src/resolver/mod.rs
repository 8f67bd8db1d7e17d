//! Type description collaborator.
//!
//! Loads one package worth of Rust sources (the `.rs` files directly in the
//! target directory), indexes the struct definitions, type aliases, and
//! inherent-impl methods found there, and resolves a named struct into a
//! [`TypeDesc`] tree the walker can consume.
//!
//! Kind mapping from Rust syntax:
//! - primitives, `String`, `char`, fixed arrays -> [`TypeDesc::Scalar`]
//! - `Option<T>` -> [`TypeDesc::Pointer`] (absent = `None`)
//! - `Vec<T>` -> [`TypeDesc::Sequence`]
//! - `HashMap<K, V>` / `BTreeMap<K, V>` -> [`TypeDesc::Mapping`]
//! - locally defined named-field structs -> [`TypeDesc::Aggregate`]
//! - `Box`/`Rc`/`Arc` wrappers and local `type` aliases are transparent
//! - `std::time::SystemTime` -> [`TypeDesc::Opaque`], compared atomically
//! - trait objects, `impl Trait`, fn pointers -> [`TypeDesc::Ignored`]
//! - everything else (enums, tuples, references, generics, foreign names)
//!   -> [`TypeDesc::Unknown`], subject to the skip/fail policy

use crate::errors::GenerateError;
use anyhow::{Context, Result};
use ignore::WalkBuilder;
use quote::ToTokens;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use syn::{
    Fields, GenericArgument, ImplItem, Item, ItemImpl, ItemStruct, PathArguments, ReturnType,
    Type, Visibility,
};

/// Description of a type as seen by the walker. Pointer, Sequence, and
/// Mapping wrap their element descriptions; Aggregate owns its exported
/// members in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDesc {
    Scalar,
    Opaque,
    Pointer(Box<TypeDesc>),
    Sequence(Box<TypeDesc>),
    Mapping {
        key: Box<TypeDesc>,
        value: Box<TypeDesc>,
    },
    Aggregate(Aggregate),
    Ignored,
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub name: String,
    pub fields: Vec<FieldDesc>,
    /// Exported zero-argument `&self` methods, sorted by name.
    pub methods: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDesc {
    pub name: String,
    pub desc: TypeDesc,
}

/// One package worth of parsed source: struct definitions, aliases, and
/// inherent-impl method names, indexed by type name.
pub struct Package {
    structs: HashMap<String, ItemStruct>,
    /// Files each struct name was seen in, for the ambiguity check.
    definitions: HashMap<String, usize>,
    aliases: HashMap<String, Type>,
    methods: HashMap<String, Vec<String>>,
}

/// Parses every `.rs` file directly inside `root` (non-recursive). Fails if
/// the directory yields no Rust sources at all.
pub fn load_package(root: &Path) -> Result<Package> {
    let files = discover_sources(root)?;
    if files.is_empty() {
        return Err(GenerateError::EmptyPackage(root.to_path_buf()).into());
    }

    let mut package = Package {
        structs: HashMap::new(),
        definitions: HashMap::new(),
        aliases: HashMap::new(),
        methods: HashMap::new(),
    };

    for path in &files {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let file = syn::parse_file(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        package.index_file(&file);
    }

    for methods in package.methods.values_mut() {
        methods.sort();
        methods.dedup();
    }

    Ok(package)
}

/// `.rs` files directly in `root`, sorted by path so that indexing order
/// (and with it any diagnostic ordering) is reproducible.
fn discover_sources(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkBuilder::new(root)
        .max_depth(Some(1))
        .hidden(false)
        .git_ignore(true)
        .build();

    for entry in walker {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "rs") {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

impl Package {
    fn index_file(&mut self, file: &syn::File) {
        for item in &file.items {
            match item {
                Item::Struct(s) => {
                    let name = s.ident.to_string();
                    *self.definitions.entry(name.clone()).or_insert(0) += 1;
                    self.structs.insert(name, s.clone());
                }
                Item::Type(alias) => {
                    self.aliases
                        .insert(alias.ident.to_string(), (*alias.ty).clone());
                }
                Item::Impl(imp) => self.index_impl(imp),
                _ => {}
            }
        }
    }

    /// Records exported zero-argument accessor methods from inherent impl
    /// blocks: `pub fn name(&self) -> T`. Trait impls are skipped; their
    /// methods are not part of the type's own surface.
    fn index_impl(&mut self, imp: &ItemImpl) {
        if imp.trait_.is_some() {
            return;
        }
        let Type::Path(self_ty) = imp.self_ty.as_ref() else {
            return;
        };
        let Some(segment) = self_ty.path.segments.last() else {
            return;
        };
        let type_name = segment.ident.to_string();

        for item in &imp.items {
            let ImplItem::Fn(method) = item else {
                continue;
            };
            if !matches!(method.vis, Visibility::Public(_)) {
                continue;
            }
            let sig = &method.sig;
            let takes_only_self = sig.inputs.len() == 1
                && sig
                    .receiver()
                    .is_some_and(|r| r.reference.is_some() && r.mutability.is_none());
            let returns_value = matches!(sig.output, ReturnType::Type(..));
            if takes_only_self && returns_value {
                self.methods
                    .entry(type_name.clone())
                    .or_default()
                    .push(sig.ident.to_string());
            }
        }
    }

    /// Resolves the named struct into a full [`TypeDesc::Aggregate`] tree.
    /// Fatal if the type is missing, defined more than once, not a
    /// named-field struct, or recursive.
    pub fn resolve_struct(&self, name: &str) -> Result<Aggregate> {
        if let Some(&count) = self.definitions.get(name) {
            if count > 1 {
                return Err(GenerateError::AmbiguousType {
                    name: name.to_string(),
                    count,
                }
                .into());
            }
        }
        let item = self
            .structs
            .get(name)
            .ok_or_else(|| GenerateError::TypeNotFound(name.to_string()))?;

        let mut stack = vec![name.to_string()];
        self.resolve_struct_item(item, &mut stack)
    }

    fn resolve_struct_item(&self, item: &ItemStruct, stack: &mut Vec<String>) -> Result<Aggregate> {
        let name = item.ident.to_string();
        let Fields::Named(named) = &item.fields else {
            return Err(GenerateError::NotAStruct {
                name,
                found: describe_fields(&item.fields),
            }
            .into());
        };

        let mut fields = Vec::new();
        for field in &named.named {
            if !matches!(field.vis, Visibility::Public(_)) {
                continue;
            }
            let field_name = field
                .ident
                .as_ref()
                .map(|ident| ident.to_string())
                .unwrap_or_default();
            let desc = self.resolve_type(&field.ty, stack)?;
            fields.push(FieldDesc {
                name: field_name,
                desc,
            });
        }

        Ok(Aggregate {
            name: name.clone(),
            fields,
            methods: self.methods.get(&name).cloned().unwrap_or_default(),
        })
    }

    fn resolve_type(&self, ty: &Type, stack: &mut Vec<String>) -> Result<TypeDesc> {
        match ty {
            Type::Array(_) => Ok(TypeDesc::Scalar),
            Type::Paren(inner) => self.resolve_type(&inner.elem, stack),
            Type::Group(inner) => self.resolve_type(&inner.elem, stack),
            Type::BareFn(_) | Type::TraitObject(_) | Type::ImplTrait(_) => Ok(TypeDesc::Ignored),
            Type::Path(path) if path.qself.is_none() => self.resolve_path(ty, path, stack),
            other => Ok(TypeDesc::Unknown(type_text(other))),
        }
    }

    fn resolve_path(
        &self,
        ty: &Type,
        path: &syn::TypePath,
        stack: &mut Vec<String>,
    ) -> Result<TypeDesc> {
        let Some(segment) = path.path.segments.last() else {
            return Ok(TypeDesc::Unknown(type_text(ty)));
        };
        let ident = segment.ident.to_string();

        if is_primitive(&ident) {
            return Ok(TypeDesc::Scalar);
        }
        if ident == "SystemTime" {
            // The single entry on the opaque allow-list: a wall-clock
            // timestamp is compared as an atomic value, not decomposed.
            return Ok(TypeDesc::Opaque);
        }

        match ident.as_str() {
            "Option" => {
                let inner = generic_arg(segment, 0).ok_or_else(|| GenerateError::UnsupportedKind {
                    path: type_text(ty),
                    kind: "Option without a type argument".to_string(),
                })?;
                Ok(TypeDesc::Pointer(Box::new(
                    self.resolve_type(inner, stack)?,
                )))
            }
            "Box" | "Rc" | "Arc" => match generic_arg(segment, 0) {
                Some(inner) => self.resolve_type(inner, stack),
                None => Ok(TypeDesc::Unknown(type_text(ty))),
            },
            "Vec" => {
                let inner = generic_arg(segment, 0).ok_or_else(|| GenerateError::UnsupportedKind {
                    path: type_text(ty),
                    kind: "Vec without a type argument".to_string(),
                })?;
                Ok(TypeDesc::Sequence(Box::new(
                    self.resolve_type(inner, stack)?,
                )))
            }
            "HashMap" | "BTreeMap" => {
                let (Some(key), Some(value)) = (generic_arg(segment, 0), generic_arg(segment, 1))
                else {
                    return Ok(TypeDesc::Unknown(type_text(ty)));
                };
                Ok(TypeDesc::Mapping {
                    key: Box::new(self.resolve_type(key, stack)?),
                    value: Box::new(self.resolve_type(value, stack)?),
                })
            }
            _ => self.resolve_named(ty, &ident, stack),
        }
    }

    /// A bare named type: a local struct, a local alias, or something this
    /// package does not define (Unknown, handled by the walk policy).
    fn resolve_named(&self, ty: &Type, ident: &str, stack: &mut Vec<String>) -> Result<TypeDesc> {
        if let Some(item) = self.structs.get(ident) {
            if stack.iter().any(|seen| seen == ident) {
                return Err(GenerateError::RecursiveType(ident.to_string()).into());
            }
            stack.push(ident.to_string());
            let aggregate = self.resolve_struct_item(item, stack);
            stack.pop();
            return Ok(TypeDesc::Aggregate(aggregate?));
        }
        if let Some(aliased) = self.aliases.get(ident) {
            // Aliases are transparent: resolve the underlying type in place.
            return self.resolve_type(aliased, stack);
        }
        Ok(TypeDesc::Unknown(type_text(ty)))
    }
}

fn generic_arg(segment: &syn::PathSegment, index: usize) -> Option<&Type> {
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    args.args
        .iter()
        .filter_map(|arg| match arg {
            GenericArgument::Type(ty) => Some(ty),
            _ => None,
        })
        .nth(index)
}

fn is_primitive(ident: &str) -> bool {
    matches!(
        ident,
        "bool"
            | "char"
            | "u8"
            | "u16"
            | "u32"
            | "u64"
            | "u128"
            | "usize"
            | "i8"
            | "i16"
            | "i32"
            | "i64"
            | "i128"
            | "isize"
            | "f32"
            | "f64"
            | "String"
    )
}

fn describe_fields(fields: &Fields) -> String {
    match fields {
        Fields::Named(_) => "a struct with named fields".to_string(),
        Fields::Unnamed(_) => "a tuple struct".to_string(),
        Fields::Unit => "a unit struct".to_string(),
    }
}

fn type_text(ty: &Type) -> String {
    ty.to_token_stream().to_string().replace(' ', "")
}
