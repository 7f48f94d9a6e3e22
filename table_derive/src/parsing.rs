//! Parsing utilities for table, field and join attributes
//!
//! Names are validated here with the same rules the registry applies at runtime, so a bad
//! identifier is a compile error pointing at the offending attribute.

use std::collections::HashSet;
use store_object::validation::{validate_alias, validate_identifier};
use syn::{
    spanned::Spanned, Attribute, Data, DeriveInput, Error, Fields, GenericArgument, Ident, LitStr,
    PathArguments, Result, Type,
};
use type_mapping::{is_optional_type, rust_type_to_logical_type, LogicalType};

/// Validate table name and return syn::Error for better proc macro error handling
pub fn validate_table_name_syn(name: &str, span: proc_macro2::Span) -> Result<()> {
    validate_identifier(name)
        .map_err(|e| Error::new(span, format!("Invalid table name '{}': {}", name, e)))
}

/// Validate column name and return syn::Error for better proc macro error handling
pub fn validate_column_name_syn(name: &str, span: proc_macro2::Span) -> Result<()> {
    validate_identifier(name)
        .map_err(|e| Error::new(span, format!("Invalid column name '{}': {}", name, e)))
}

#[derive(Debug)]
pub struct TableInfo {
    pub name: String,
}

#[derive(Debug)]
pub struct ColumnInfo {
    pub ident: Ident,
    pub column: String,
    pub logical_type: LogicalType,
    pub nullable: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub soft_delete: bool,
    pub readonly: bool,
    /// Stored through the serde JSON codec rather than the field's own conversion
    pub json: bool,
}

#[derive(Debug)]
pub struct FieldInfo {
    pub columns: Vec<ColumnInfo>,
    /// `#[field(skip)]` fields, filled with `Default::default()` on read
    pub skipped: Vec<Ident>,
}

impl FieldInfo {
    pub fn primary_key(&self) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.primary_key)
    }
}

pub fn parse_table_attributes(input: &DeriveInput) -> Result<TableInfo> {
    let mut table_name: Option<LitStr> = None;

    for attr in input.attrs.iter().filter(|a| a.path().is_ident("table")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                table_name = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("unsupported table attribute, expected `name = \"...\"`"))
            }
        })?;
    }

    let table_name = table_name.ok_or_else(|| {
        Error::new(
            input.ident.span(),
            "table attribute is required: add #[table(name = \"table_name\")] to your struct",
        )
    })?;

    validate_table_name_syn(&table_name.value(), table_name.span())?;

    Ok(TableInfo {
        name: table_name.value(),
    })
}

#[derive(Default)]
struct FieldOptions {
    name: Option<LitStr>,
    json: bool,
    readonly: bool,
    skip: bool,
}

fn parse_field_options(attrs: &[Attribute]) -> Result<FieldOptions> {
    let mut options = FieldOptions::default();
    for attr in attrs {
        if attr.path().is_ident("readonly") {
            options.readonly = true;
        } else if attr.path().is_ident("field") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    options.name = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("json") {
                    options.json = true;
                } else if meta.path.is_ident("readonly") {
                    options.readonly = true;
                } else if meta.path.is_ident("skip") {
                    options.skip = true;
                } else {
                    return Err(meta.error(
                        "unsupported field attribute, expected `name`, `json`, `readonly` or `skip`",
                    ));
                }
                Ok(())
            })?;
        }
    }
    Ok(options)
}

pub fn parse_field_attributes(input: &DeriveInput, table_info: &TableInfo) -> Result<FieldInfo> {
    let fields_named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => named,
            _ => {
                return Err(Error::new(
                    input.ident.span(),
                    "TableMetadata can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(Error::new(
                input.ident.span(),
                "TableMetadata can only be derived for structs",
            ))
        }
    };

    let mut columns = Vec::new();
    let mut skipped = Vec::new();
    let mut seen = HashSet::new();

    for field in &fields_named.named {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| Error::new_spanned(field, "Field must have a name"))?;
        let options = parse_field_options(&field.attrs)?;
        let primary_key = has_attribute(&field.attrs, "primary_key");
        let soft_delete = has_attribute(&field.attrs, "soft_delete");

        if options.skip {
            if primary_key || soft_delete {
                return Err(Error::new(
                    ident.span(),
                    "a skipped field cannot be the primary key or the soft-delete flag",
                ));
            }
            skipped.push(ident);
            continue;
        }

        let column = match &options.name {
            Some(name) => {
                validate_column_name_syn(&name.value(), name.span())?;
                name.value()
            }
            None => {
                let name = ident.to_string();
                let name = name.strip_prefix("r#").unwrap_or(&name).to_string();
                validate_column_name_syn(&name, ident.span())?;
                name
            }
        };
        if !seen.insert(column.to_ascii_lowercase()) {
            return Err(Error::new(
                ident.span(),
                format!("column '{}' is mapped more than once in '{}'", column, table_info.name),
            ));
        }

        let ty = &field.ty;
        let type_string = quote::quote!(#ty).to_string();
        let logical_type = if options.json {
            LogicalType::JsonBlob
        } else {
            rust_type_to_logical_type(&type_string)
        };

        if soft_delete && !matches!(logical_type, LogicalType::Boolean | LogicalType::Number) {
            return Err(Error::new(
                ty.span(),
                "soft-delete flag must be a boolean or numeric field",
            ));
        }

        columns.push(ColumnInfo {
            ident,
            column,
            logical_type,
            nullable: is_optional_type(&type_string),
            primary_key,
            auto_increment: has_attribute(&field.attrs, "auto_increment"),
            soft_delete,
            readonly: options.readonly,
            json: options.json,
        });
    }

    let keys: Vec<&ColumnInfo> = columns.iter().filter(|c| c.primary_key).collect();
    match keys.as_slice() {
        [] => {
            return Err(Error::new(
                input.ident.span(),
                format!("'{}' needs exactly one #[primary_key] field", table_info.name),
            ))
        }
        [_] => {}
        [_, second, ..] => {
            return Err(Error::new(
                second.ident.span(),
                "only one field can be marked #[primary_key]",
            ))
        }
    }

    let flags: Vec<&ColumnInfo> = columns.iter().filter(|c| c.soft_delete).collect();
    if let [_, second, ..] = flags.as_slice() {
        return Err(Error::new(
            second.ident.span(),
            "only one field can be marked #[soft_delete]",
        ));
    }
    if let Some(flag) = flags.first().filter(|f| f.primary_key) {
        return Err(Error::new(
            flag.ident.span(),
            "the primary key cannot be the soft-delete flag",
        ));
    }

    Ok(FieldInfo { columns, skipped })
}

pub fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}

/// How a joined field receives its member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Required,
    Optional,
    Many,
}

#[derive(Debug)]
pub struct JoinFieldInfo {
    pub ident: Ident,
    /// Entity type with any `Option<_>`/`Vec<_>` wrapper removed
    pub entity: Type,
    pub slot: SlotKind,
    pub alias: String,
    pub on: Option<String>,
    /// `inner`, `left`, `right` or `full`
    pub kind: Option<String>,
}

pub fn parse_join_fields(input: &DeriveInput) -> Result<Vec<JoinFieldInfo>> {
    let fields_named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => named,
            _ => {
                return Err(Error::new(
                    input.ident.span(),
                    "JoinedEntity can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(Error::new(
                input.ident.span(),
                "JoinedEntity can only be derived for structs",
            ))
        }
    };

    let mut members = Vec::new();
    let mut aliases = HashSet::new();

    for field in &fields_named.named {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| Error::new_spanned(field, "Field must have a name"))?;
        let attr = field
            .attrs
            .iter()
            .find(|a| a.path().is_ident("join"))
            .ok_or_else(|| Error::new(ident.span(), "every field needs a #[join(alias = \"...\")] attribute"))?;

        let mut alias: Option<LitStr> = None;
        let mut on: Option<LitStr> = None;
        let mut kind: Option<LitStr> = None;
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("alias") {
                alias = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("on") {
                on = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("kind") {
                let lit: LitStr = meta.value()?.parse()?;
                if !matches!(
                    lit.value().to_ascii_lowercase().as_str(),
                    "inner" | "left" | "right" | "full"
                ) {
                    return Err(Error::new(
                        lit.span(),
                        "join kind must be one of inner, left, right, full",
                    ));
                }
                kind = Some(lit);
            } else {
                return Err(meta.error("unsupported join attribute, expected `alias`, `on` or `kind`"));
            }
            Ok(())
        })?;

        let alias = alias.ok_or_else(|| Error::new(attr.span(), "join attribute needs `alias = \"...\"`"))?;
        validate_alias(&alias.value())
            .map_err(|e| Error::new(alias.span(), format!("Invalid join alias: {}", e)))?;
        if !aliases.insert(alias.value().to_ascii_lowercase()) {
            return Err(Error::new(alias.span(), "join alias is used more than once"));
        }

        let (slot, entity) = slot_of(&field.ty);
        members.push(JoinFieldInfo {
            ident,
            entity,
            slot,
            alias: alias.value(),
            on: on.map(|lit| lit.value()),
            kind: kind.map(|lit| lit.value().to_ascii_lowercase()),
        });
    }

    let Some(root) = members.first() else {
        return Err(Error::new(input.ident.span(), "JoinedEntity needs at least one field"));
    };
    if root.on.is_some() || root.kind.is_some() || root.slot != SlotKind::Required {
        return Err(Error::new(
            root.ident.span(),
            "the first field is the join root: a plain entity with only an alias",
        ));
    }
    for member in &members[1..] {
        if member.on.is_none() {
            return Err(Error::new(
                member.ident.span(),
                "joined fields need an `on = \"...\"` condition",
            ));
        }
    }

    Ok(members)
}

/// Split `Option<T>` / `Vec<T>` into their slot kind and `T`
fn slot_of(ty: &Type) -> (SlotKind, Type) {
    if let Type::Path(path) = ty {
        if let Some(segment) = path.path.segments.last() {
            let slot = match segment.ident.to_string().as_str() {
                "Option" => Some(SlotKind::Optional),
                "Vec" => Some(SlotKind::Many),
                _ => None,
            };
            if let (Some(slot), PathArguments::AngleBracketed(args)) = (slot, &segment.arguments) {
                if let Some(GenericArgument::Type(inner)) = args.args.first() {
                    return (slot, inner.clone());
                }
            }
        }
    }
    (SlotKind::Required, ty.clone())
}
