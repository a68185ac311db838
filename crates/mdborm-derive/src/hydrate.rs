//! Hydrate derive macro implementation

use heck::ToLowerCamelCase;
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

use crate::common::syn_types::option_inner;

/// Per-field `#[orm(...)]` options.
#[derive(Default)]
struct FieldAttrs {
    property: Option<String>,
    composite: bool,
    skip: bool,
}

fn field_attrs(field: &syn::Field) -> Result<FieldAttrs> {
    let mut attrs = FieldAttrs::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("property") {
                let lit: syn::LitStr = meta.value()?.parse()?;
                attrs.property = Some(lit.value());
                Ok(())
            } else if meta.path.is_ident("composite") {
                attrs.composite = true;
                Ok(())
            } else if meta.path.is_ident("skip") {
                attrs.skip = true;
                Ok(())
            } else {
                Err(meta.error("expected `property = \"...\"`, `composite` or `skip`"))
            }
        })?;
    }
    Ok(attrs)
}

/// Struct-level `#[orm(finalize = "method")]`.
fn finalize_method(input: &DeriveInput) -> Result<Option<syn::Ident>> {
    let mut method = None;
    for attr in &input.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("finalize") {
                let lit: syn::LitStr = meta.value()?.parse()?;
                method = Some(lit.parse::<syn::Ident>()?);
                Ok(())
            } else {
                Err(meta.error("expected `finalize = \"method\"`"))
            }
        })?;
    }
    Ok(method)
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let type_name = name.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Hydrate can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Hydrate can only be derived for structs",
            ));
        }
    };

    let mut property_arms = Vec::new();
    let mut composite_arms = Vec::new();

    for field in fields {
        let attrs = field_attrs(field)?;
        if attrs.skip {
            continue;
        }
        let Some(field_ident) = field.ident.as_ref() else {
            continue;
        };
        let property = attrs
            .property
            .unwrap_or_else(|| field_ident.to_string().to_lower_camel_case());
        let ty = &field.ty;

        if attrs.composite {
            let (inner, assign) = match option_inner(ty) {
                Some(inner) => (inner, quote! { ::core::option::Option::Some(*composite) }),
                None => (ty, quote! { *composite }),
            };
            composite_arms.push(quote! {
                #property => {
                    let composite = composite.downcast::<#inner>().map_err(|_| {
                        ::mdborm::OrmError::decode(
                            name,
                            concat!("composite is not a ", stringify!(#inner)),
                        )
                    })?;
                    self.#field_ident = #assign;
                    ::core::result::Result::Ok(())
                }
            });
        } else {
            property_arms.push(quote! {
                #property => {
                    self.#field_ident = <#ty as ::mdborm::FromValue>::from_value(value)
                        .map_err(|e| ::mdborm::OrmError::decode(name, e.to_string()))?;
                    ::core::result::Result::Ok(())
                }
            });
        }
    }

    let unknown_property = format!("{type_name} has no property with this name");
    let unknown_composite = format!("{type_name} has no composite property with this name");

    let set_composite = if composite_arms.is_empty() {
        quote! {}
    } else {
        quote! {
            fn set_composite(
                &mut self,
                name: &str,
                composite: ::std::boxed::Box<dyn ::std::any::Any>,
            ) -> ::mdborm::OrmResult<()> {
                match name {
                    #(#composite_arms)*
                    _ => {
                        let _ = composite;
                        ::core::result::Result::Err(::mdborm::OrmError::decode(
                            name,
                            #unknown_composite,
                        ))
                    }
                }
            }
        }
    };

    let finalize = match finalize_method(&input)? {
        Some(method) => quote! {
            fn finalize(&mut self, args: &[::mdborm::Value]) -> ::mdborm::OrmResult<()> {
                self.#method(args)
            }
        },
        None => quote! {},
    };

    Ok(quote! {
        impl #impl_generics ::mdborm::Hydrate for #name #ty_generics #where_clause {
            fn set_property(
                &mut self,
                name: &str,
                value: ::mdborm::Value,
            ) -> ::mdborm::OrmResult<()> {
                match name {
                    #(#property_arms)*
                    _ => {
                        let _ = value;
                        ::core::result::Result::Err(::mdborm::OrmError::decode(
                            name,
                            #unknown_property,
                        ))
                    }
                }
            }

            #set_composite

            #finalize
        }
    })
}
