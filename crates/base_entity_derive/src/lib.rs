//! `#[base_entity]` fills in the bookkeeping columns shared by every table and
//! wires the generated sea-orm `ActiveModel` into the DAO helper traits.
//!
//! Options (comma separated):
//! - `traits = "path"`: module holding the helper traits
//!   (default `crate::db::dao::base_traits`)
//! - `no_id`: the model declares its own (possibly composite) primary key
//! - `no_updated_at`: rows are insert-only, no `updated_at` column

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use std::collections::HashSet;
use syn::{
    Expr, ExprLit, Field, Fields, Ident, ItemStruct, Lit, Meta, Path, Token, parse_macro_input,
    parse_quote, parse_str, punctuated::Punctuated,
};

struct BaseEntityConfig {
    traits_path: Path,
    with_id: bool,
    with_updated_at: bool,
}

impl Default for BaseEntityConfig {
    fn default() -> Self {
        Self {
            traits_path: parse_str("crate::db::dao::base_traits")
                .expect("default traits path should parse"),
            with_id: true,
            with_updated_at: true,
        }
    }
}

#[proc_macro_attribute]
pub fn base_entity(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr with Punctuated<Meta, Token![,]>::parse_terminated);
    let mut config = BaseEntityConfig::default();
    if let Err(err) = apply_args(&mut config, args) {
        return err.to_compile_error().into();
    }

    let mut input = parse_macro_input!(item as ItemStruct);
    let Fields::Named(fields) = &mut input.fields else {
        return syn::Error::new_spanned(input, "base_entity requires a struct with named fields")
            .to_compile_error()
            .into();
    };

    let existing: HashSet<String> = fields
        .named
        .iter()
        .filter_map(|field| field.ident.as_ref().map(ToString::to_string))
        .collect();

    let mut injected: Punctuated<Field, Token![,]> = Punctuated::new();
    for field in bookkeeping_fields(&config) {
        let name = field.ident.as_ref().map(ToString::to_string);
        if name.is_some_and(|name| existing.contains(&name)) {
            continue;
        }
        injected.push(field);
    }
    injected.extend(fields.named.iter().cloned());
    fields.named = injected;

    let impls = trait_impls(&config);
    quote! {
        #input
        #impls
    }
    .into()
}

fn bookkeeping_fields(config: &BaseEntityConfig) -> Vec<Field> {
    let mut out = Vec::with_capacity(3);
    if config.with_id {
        out.push(parse_quote! {
            #[sea_orm(primary_key, auto_increment = false)]
            pub id: uuid::Uuid
        });
    }
    out.push(parse_quote! {
        #[sea_orm(default_expr = "Expr::current_timestamp()")]
        pub created_at: sea_orm::entity::prelude::DateTimeWithTimeZone
    });
    if config.with_updated_at {
        out.push(parse_quote! {
            #[sea_orm(default_expr = "Expr::current_timestamp()")]
            pub updated_at: sea_orm::entity::prelude::DateTimeWithTimeZone
        });
    }
    out
}

fn trait_impls(config: &BaseEntityConfig) -> TokenStream2 {
    let traits_path = &config.traits_path;
    let active_model = Ident::new("ActiveModel", Span::call_site());

    let id_impl = config.with_id.then(|| {
        quote! {
            impl #traits_path::HasIdActiveModel for #active_model {
                fn set_id(&mut self, id: uuid::Uuid) {
                    self.id = sea_orm::ActiveValue::Set(id);
                }
            }
        }
    });

    let updated_impl = config.with_updated_at.then(|| {
        quote! {
            impl #traits_path::UpdatableActiveModel for #active_model {
                fn set_updated_at(
                    &mut self,
                    ts: sea_orm::entity::prelude::DateTimeWithTimeZone,
                ) {
                    self.updated_at = sea_orm::ActiveValue::Set(ts);
                }
            }
        }
    });

    quote! {
        #id_impl
        #updated_impl

        impl #traits_path::TimestampedActiveModel for #active_model {
            fn set_created_at(
                &mut self,
                ts: sea_orm::entity::prelude::DateTimeWithTimeZone,
            ) {
                self.created_at = sea_orm::ActiveValue::Set(ts);
            }
        }

        impl #traits_path::HasCreatedAtColumn for Entity {
            fn created_at_column() -> Column {
                Column::CreatedAt
            }
        }
    }
}

fn apply_args(
    config: &mut BaseEntityConfig,
    args: Punctuated<Meta, Token![,]>,
) -> Result<(), syn::Error> {
    for meta in args {
        match meta {
            Meta::Path(path) => {
                let Some(flag) = path.get_ident() else {
                    return Err(syn::Error::new_spanned(path, "expected a flag name"));
                };
                match flag.to_string().as_str() {
                    "no_id" => config.with_id = false,
                    "no_updated_at" => config.with_updated_at = false,
                    _ => {
                        return Err(syn::Error::new_spanned(flag, "unknown base_entity flag"));
                    }
                }
            }
            Meta::NameValue(name_value) => {
                let is_traits = name_value.path.is_ident("traits");
                if !is_traits {
                    return Err(syn::Error::new_spanned(
                        name_value.path,
                        "unknown base_entity attribute key",
                    ));
                }
                let Expr::Lit(ExprLit {
                    lit: Lit::Str(value),
                    ..
                }) = name_value.value
                else {
                    return Err(syn::Error::new_spanned(
                        name_value.value,
                        "expected string literal for attribute value",
                    ));
                };
                config.traits_path = value.parse::<Path>().map_err(|err| {
                    syn::Error::new(value.span(), format!("invalid traits path: {err}"))
                })?;
            }
            Meta::List(list) => {
                return Err(syn::Error::new_spanned(
                    list,
                    "expected `flag` or `key = \"value\"`",
                ));
            }
        }
    }

    Ok(())
}
