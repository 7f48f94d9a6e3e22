//! Code generation for the derive macros
//!
//! Generated code names the facade crate (`::dbhelper`), so entities are declared in
//! crates depending on `dbhelper`.

use crate::parsing::{ColumnInfo, FieldInfo, JoinFieldInfo, SlotKind, TableInfo};
use proc_macro2::TokenStream;
use quote::quote;
use syn::Ident;
use type_mapping::LogicalType;

fn logical_type_tokens(logical_type: LogicalType) -> TokenStream {
    let variant = match logical_type {
        LogicalType::String => quote!(String),
        LogicalType::Number => quote!(Number),
        LogicalType::Boolean => quote!(Boolean),
        LogicalType::Temporal => quote!(Temporal),
        LogicalType::JsonBlob => quote!(JsonBlob),
    };
    quote!(::dbhelper::type_mapping::LogicalType::#variant)
}

fn column_descriptor(column: &ColumnInfo) -> TokenStream {
    let name = &column.column;
    let field = column.ident.to_string();
    let logical_type = logical_type_tokens(column.logical_type);
    let nullable = column.nullable;

    let mut tokens = quote! {
        ::dbhelper::store_object::ColumnDescriptor::new(#name, #field, #logical_type)
            .nullable(#nullable)
    };
    if column.primary_key {
        tokens = quote!(#tokens.primary_key());
    }
    if column.auto_increment {
        tokens = quote!(#tokens.auto_increment());
    }
    if column.soft_delete {
        tokens = quote!(#tokens.soft_delete());
    }
    if column.readonly {
        tokens = quote!(#tokens.readonly());
    }
    tokens
}

fn to_value(column: &ColumnInfo) -> TokenStream {
    let ident = &column.ident;
    let name = &column.column;
    if column.json {
        quote! {
            ::dbhelper::type_mapping::json::to_sql(&self.#ident).map_err(|e| e.in_column(#name))?
        }
    } else {
        quote! {
            ::dbhelper::type_mapping::ToSqlValue::to_sql_value(&self.#ident)
                .map_err(|e| e.in_column(#name))?
        }
    }
}

fn from_row(column: &ColumnInfo) -> TokenStream {
    let ident = &column.ident;
    let name = &column.column;
    if column.json {
        quote! {
            #ident: ::dbhelper::type_mapping::json::from_sql(row.value(#name)?)
                .map_err(|e| e.in_column(#name))?
        }
    } else {
        quote! {
            #ident: row.decode(#name)?
        }
    }
}

pub fn generate_table_metadata_impl(
    name: &Ident,
    generics: &syn::Generics,
    table_info: &TableInfo,
    field_info: &FieldInfo,
) -> syn::Result<TokenStream> {
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let table = &table_info.name;
    let descriptors = field_info.columns.iter().map(column_descriptor);
    let values = field_info.columns.iter().map(to_value);
    let reads = field_info.columns.iter().map(from_row);
    let skipped = &field_info.skipped;

    let key = field_info
        .primary_key()
        .ok_or_else(|| syn::Error::new(name.span(), "missing primary key"))?;
    let key_ident = &key.ident;
    let key_name = &key.column;

    Ok(quote! {
        impl #impl_generics ::dbhelper::store_object::TableMetadata for #name #ty_generics #where_clause {
            fn descriptor() -> ::dbhelper::store_object::EntityDescriptor {
                ::dbhelper::store_object::EntityDescriptor::new(#table)
                    #(.column(#descriptors))*
            }

            fn column_values(
                &self,
            ) -> ::std::result::Result<
                ::std::vec::Vec<::dbhelper::type_mapping::SqlValue>,
                ::dbhelper::type_mapping::ValueError,
            > {
                ::std::result::Result::Ok(::std::vec![#(#values),*])
            }

            fn from_row(
                row: &::dbhelper::type_mapping::RowView<'_>,
            ) -> ::std::result::Result<Self, ::dbhelper::type_mapping::ValueError> {
                ::std::result::Result::Ok(Self {
                    #(#reads,)*
                    #(#skipped: ::std::default::Default::default(),)*
                })
            }

            fn set_generated_key(
                &mut self,
                key: &::dbhelper::type_mapping::SqlValue,
            ) -> ::std::result::Result<(), ::dbhelper::type_mapping::ValueError> {
                self.#key_ident = ::dbhelper::type_mapping::FromSqlValue::from_sql_value(key)
                    .map_err(|e| e.in_column(#key_name))?;
                ::std::result::Result::Ok(())
            }
        }
    })
}

fn join_type_tokens(kind: &str) -> TokenStream {
    match kind {
        "left" => quote!(::dbhelper::store_object::JoinType::Left),
        "right" => quote!(::dbhelper::store_object::JoinType::Right),
        "full" => quote!(::dbhelper::store_object::JoinType::Full),
        _ => quote!(::dbhelper::store_object::JoinType::Inner),
    }
}

pub fn generate_joined_entity_impl(
    name: &Ident,
    generics: &syn::Generics,
    members: &[JoinFieldInfo],
) -> TokenStream {
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let Some((root, joined)) = members.split_first() else {
        return quote!();
    };

    let root_entity = &root.entity;
    let root_alias = &root.alias;
    let joins = joined.iter().map(|member| {
        let entity = &member.entity;
        let alias = &member.alias;
        let on = member.on.as_deref().unwrap_or_default();
        // optional and many slots default to an outer join so the root survives a miss
        let kind = match (member.kind.as_deref(), member.slot) {
            (Some(kind), _) => kind,
            (None, SlotKind::Required) => "inner",
            (None, _) => "left",
        };
        let join_type = join_type_tokens(kind);
        quote!(.join::<#entity>(#join_type, #alias, #on))
    });

    let assignments = members.iter().map(|member| {
        let ident = &member.ident;
        let entity = &member.entity;
        let alias = &member.alias;
        match member.slot {
            SlotKind::Required if std::ptr::eq(member, root) => {
                quote!(#ident: group.root::<#entity>(#alias)?)
            }
            SlotKind::Required => quote!(#ident: group.required::<#entity>(#alias)?),
            SlotKind::Optional => quote!(#ident: group.optional::<#entity>(#alias)?),
            SlotKind::Many => quote!(#ident: group.many::<#entity>(#alias)?),
        }
    });

    quote! {
        impl #impl_generics ::dbhelper::store_object::JoinedEntity for #name #ty_generics #where_clause {
            fn join_spec() -> ::dbhelper::store_object::JoinSpec {
                ::dbhelper::store_object::JoinSpec::root::<#root_entity>(#root_alias)
                    #(#joins)*
            }

            fn assemble(
                group: &::dbhelper::store_object::JoinGroup<'_>,
            ) -> ::std::result::Result<Self, ::dbhelper::store_object::StoreError> {
                ::std::result::Result::Ok(Self {
                    #(#assignments,)*
                })
            }
        }
    }
}
