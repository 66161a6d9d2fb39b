use crate::{error::VerificationError, REQUIRED_VARIANTS};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, Ident, Result, Variant};

fn is_dependent(variant: &Variant) -> bool {
    variant.attrs.iter().any(|a| a.path.is_ident("dependent"))
}

fn is_happy(ident: &Ident) -> bool {
    REQUIRED_VARIANTS.iter().any(|r| ident == r)
}

/// The variants of a condition enum, sorted by their role.
struct Roles<'a> {
    happy: &'a Ident,
    dependents: Vec<&'a Ident>,
    /// Every variant but the happy one, in declaration order.
    others: Vec<&'a Ident>,
}

fn classify<'a>(name: &Ident, variants: impl IntoIterator<Item = &'a Variant>) -> Result<Roles<'a>> {
    let mut happy: Option<&Ident> = None;
    let mut dependents = Vec::new();
    let mut others = Vec::new();

    for variant in variants {
        let ident = &variant.ident;
        if !matches!(variant.fields, Fields::Unit) {
            return Err(VerificationError::NotFieldless(ident.to_string()).at(ident.span()));
        }
        if !is_happy(ident) {
            if is_dependent(variant) {
                dependents.push(ident);
            }
            others.push(ident);
            continue;
        }
        if is_dependent(variant) {
            return Err(VerificationError::DependentHappy(ident.to_string()).at(ident.span()));
        }
        if let Some(first) = happy {
            let err = VerificationError::DuplicateHappy {
                first: first.to_string(),
                second: ident.to_string(),
            };
            return Err(err.at(ident.span()));
        }
        happy = Some(ident);
    }

    let happy = happy.ok_or_else(|| VerificationError::MissingHappy.at(name.span()))?;
    Ok(Roles { happy, dependents, others })
}

fn lower(ident: &Ident) -> Ident {
    Ident::new(&ident.to_string().to_lowercase(), ident.span())
}

/// `impl ConditionType`, `Default` and `Display` for the enum.
fn condition_type(name: &Ident, roles: &Roles) -> TokenStream2 {
    let happy = roles.happy;
    let dependents = &roles.dependents;
    quote! {
        #[automatically_derived]
        impl ::knative_conditions::ConditionType for #name {
            #[inline]
            fn happy() -> Self {
                #name::#happy
            }

            #[inline]
            fn dependents() -> &'static [Self] {
                &[#(#name::#dependents),*]
            }
        }

        #[automatically_derived]
        impl Default for #name {
            fn default() -> Self {
                #name::#happy
            }
        }

        #[automatically_derived]
        impl ::std::fmt::Display for #name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::write!(f, "{:?}", self)
            }
        }
    }
}

/// `<Name>Type`: one constructor per non-happy variant, so other condition enums can duck type
/// to this one.
fn duck_trait(name: &Ident, trait_name: &Ident, roles: &Roles) -> TokenStream2 {
    let variants = &roles.others;
    let ctors: Vec<_> = variants.iter().map(|v| lower(v)).collect();
    let docs = variants.iter().map(|v| format!("Returns the `{v}` variant of the [`ConditionType`]"));
    let trait_doc = format!("A [`ConditionType`] that implement this trait duck types to [`{name}`].");
    quote! {
        #[doc = #trait_doc]
        pub trait #trait_name: ::knative_conditions::ConditionType {
            #(
                #[doc = #docs]
                fn #ctors() -> Self;
            )*
        }

        #[automatically_derived]
        impl #trait_name for #name {
            #(
                #[inline]
                fn #ctors() -> Self {
                    #name::#variants
                }
            )*
        }
    }
}

/// `<Name>Manager`: `mark_<v>`, `mark_<v>_with_reason` and `mark_not_<v>` on any accessor of
/// conditions that duck type to the enum.
fn manager_trait(name: &Ident, trait_name: &Ident, roles: &Roles) -> TokenStream2 {
    let manager_name = format_ident!("{}Manager", name);
    let manager_doc = format!("Allows a status to manage [`{name}`].");
    let ctors: Vec<_> = roles.others.iter().map(|v| lower(v)).collect();
    let mark = ctors.iter().map(|c| format_ident!("mark_{}", c));
    let mark_with_reason = ctors.iter().map(|c| format_ident!("mark_{}_with_reason", c));
    let mark_not = ctors.iter().map(|c| format_ident!("mark_not_{}", c));
    quote! {
        #[doc = #manager_doc]
        pub trait #manager_name<S>: ::knative_conditions::ConditionAccessor<S>
        where S: #trait_name {
            #(
                fn #mark(&mut self) {
                    self.manager().mark_true(S::#ctors());
                }

                fn #mark_with_reason(&mut self, reason: &str, message: Option<String>) {
                    self.manager().mark_true_with_reason(S::#ctors(), reason, message);
                }

                fn #mark_not(&mut self, reason: &str, message: Option<String>) {
                    self.manager().mark_false(S::#ctors(), reason, message);
                }
            )*
        }

        impl<S: #trait_name, T: ::knative_conditions::ConditionAccessor<S> + ?Sized> #manager_name<S> for T {}
    }
}

pub fn inner_derive(ast: DeriveInput) -> Result<TokenStream> {
    let name = &ast.ident;
    let variants = match &ast.data {
        Data::Enum(data) => &data.variants,
        _ => return Err(VerificationError::NotAnEnum.at(name.span())),
    };

    let roles = classify(name, variants)?;
    let trait_name = format_ident!("{}Type", name);

    let mut tokens = condition_type(name, &roles);
    tokens.extend(duck_trait(name, &trait_name, &roles));
    tokens.extend(manager_trait(name, &trait_name, &roles));
    Ok(tokens.into())
}
