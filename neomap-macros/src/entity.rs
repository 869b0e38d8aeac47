use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Expr, ExprLit, Fields, Lit};

struct StructMeta {
    label: Option<String>,
    extends: Option<syn::Path>,
}

fn get_struct_meta(ast: &DeriveInput) -> StructMeta {
    let mut meta = StructMeta {
        label: None,
        extends: None,
    };
    for attr in &ast.attrs {
        if attr.path().is_ident("entity") {
            let _ = attr.parse_nested_meta(|nested| {
                if nested.path.is_ident("label") {
                    let value = nested.value()?;
                    let expr: Expr = value.parse()?;
                    if let Expr::Lit(ExprLit { lit: Lit::Str(s), .. }) = expr {
                        meta.label = Some(s.value());
                    }
                } else if nested.path.is_ident("extends") {
                    let value = nested.value()?;
                    meta.extends = Some(value.parse()?);
                }
                Ok(())
            });
        }
    }
    meta
}

struct FieldMeta {
    rename: Option<String>,
    complex: bool,
    navigation: bool,
    foreign_key: Option<String>,
    skip: bool,
}

fn get_field_meta(field: &syn::Field) -> FieldMeta {
    let mut meta = FieldMeta {
        rename: None,
        complex: false,
        navigation: false,
        foreign_key: None,
        skip: false,
    };
    for attr in &field.attrs {
        if attr.path().is_ident("entity") {
            let _ = attr.parse_nested_meta(|nested| {
                if nested.path.is_ident("rename") {
                    let value = nested.value()?;
                    let expr: Expr = value.parse()?;
                    if let Expr::Lit(ExprLit { lit: Lit::Str(s), .. }) = expr {
                        meta.rename = Some(s.value());
                    }
                } else if nested.path.is_ident("complex") {
                    meta.complex = true;
                } else if nested.path.is_ident("navigation") {
                    meta.navigation = true;
                } else if nested.path.is_ident("foreign_key") {
                    let value = nested.value()?;
                    let expr: Expr = value.parse()?;
                    if let Expr::Lit(ExprLit { lit: Lit::Str(s), .. }) = expr {
                        meta.foreign_key = Some(s.value());
                    }
                } else if nested.path.is_ident("skip") {
                    meta.skip = true;
                }
                Ok(())
            });
        }
    }
    meta
}

pub fn expand(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    let name = &ast.ident;
    let type_name = name.to_string();

    let struct_meta = get_struct_meta(&ast);
    let label = struct_meta.label.unwrap_or_else(|| type_name.clone());

    let fields = match &ast.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(named) => named.named.iter().collect::<Vec<_>>(),
            _ => {
                return syn::Error::new_spanned(&ast, "Entity only supports structs with named fields")
                    .to_compile_error()
                    .into();
            }
        },
        _ => {
            return syn::Error::new_spanned(&ast, "Entity only supports structs")
                .to_compile_error()
                .into();
        }
    };

    let mut descriptors = Vec::new();

    for field in fields {
        let meta = get_field_meta(field);
        if meta.skip {
            continue;
        }
        let ident = field.ident.as_ref().unwrap();
        let field_name = ident.to_string();
        let ty = &field.ty;

        if meta.complex && meta.navigation {
            return syn::Error::new_spanned(
                field,
                "a field cannot be both complex and navigation",
            )
            .to_compile_error()
            .into();
        }

        let mut descriptor = if meta.complex {
            quote! {
                neomap_core::descriptor::FieldDescriptor::complex(
                    #field_name,
                    <#ty as neomap_core::descriptor::Entity>::descriptor,
                )
            }
        } else if meta.navigation {
            quote! {
                neomap_core::descriptor::FieldDescriptor::navigation(#field_name)
            }
        } else {
            quote! {
                neomap_core::descriptor::FieldDescriptor::scalar(#field_name)
            }
        };

        if let Some(rename) = &meta.rename {
            descriptor = quote! { #descriptor.renamed(#rename) };
        }
        if let Some(fk) = &meta.foreign_key {
            if !meta.navigation {
                return syn::Error::new_spanned(
                    field,
                    "foreign_key is only valid on navigation fields",
                )
                .to_compile_error()
                .into();
            }
            descriptor = quote! { #descriptor.with_foreign_key(#fk) };
        }

        descriptors.push(descriptor);
    }

    let build = quote! {
        neomap_core::descriptor::EntityDescriptor::new::<#name>(
            #type_name,
            #label,
            vec![#(#descriptors,)*],
        )
    };
    let build = match &struct_meta.extends {
        Some(base) => quote! {
            #build.extending(<#base as neomap_core::descriptor::Entity>::descriptor)
        },
        None => build,
    };

    let expanded = quote! {
        impl neomap_core::descriptor::Entity for #name {
            const LABEL: &'static str = #label;

            fn descriptor() -> neomap_core::descriptor::EntityDescriptor {
                #build
            }
        }
    };

    expanded.into()
}
