//! Procedural macros for flowx
//!
//! This crate provides the `#[inject]` attribute macro, which turns a plain task
//! function into a named dependency-graph task whose dependencies are its parameter
//! names.

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{parse_macro_input, FnArg, Ident, ItemFn, LitStr, Pat, PatType, ReturnType, Type, Visibility};

/// Attribute macro deriving a dependency-graph task from a function signature.
///
/// Apply this to a free function (sync or async) returning `Result<T, E>`. Every
/// parameter names the task it depends on; the parameter receives that task's output.
/// The function is replaced by a zero-argument constructor with the same name
/// returning `flowx::AutoTask<E>`.
///
/// - `name: &T` borrows the dependency's output
/// - `name: T` clones it (`T: Clone`)
/// - no parameters produces a task without dependencies
///
/// # Example
///
/// ```ignore
/// use flowx::{inject, Auto};
///
/// #[inject]
/// async fn width() -> Result<u32, String> {
///     Ok(3)
/// }
///
/// #[inject]
/// async fn height() -> Result<u32, String> {
///     Ok(4)
/// }
///
/// #[inject]
/// async fn area(width: &u32, height: u32) -> Result<u32, String> {
///     Ok(width * height)
/// }
///
/// let plan = Auto::new()
///     .task("width", width())
///     .task("height", height())
///     .task("area", area())
///     .plan()?;
/// ```
///
/// # Generated Code
///
/// ```ignore
/// // Your code:
/// #[inject]
/// async fn area(width: &u32, height: u32) -> Result<u32, String> {
///     Ok(width * height)
/// }
///
/// // Generated:
/// fn area() -> ::flowx::AutoTask<<Result<u32, String> as ::flowx::TaskResult>::Error> {
///     async fn area(width: &u32, height: u32) -> Result<u32, String> {
///         Ok(width * height)
///     }
///
///     ::flowx::AutoTask::with_deps(["width", "height"], |deps: ::flowx::Results| async move {
///         let width = ::flowx::injected::<u32>(&deps, "width");
///         let height = ::flowx::injected::<u32>(&deps, "height");
///         ::flowx::TaskResult::into_result(area(width, ::core::clone::Clone::clone(height)).await)
///     })
/// }
/// ```
///
/// # Panics
///
/// The generated task panics if a dependency's output is not of the parameter's type.
///
/// # Requirements
///
/// - The function must be a free function (no `self`) without generic parameters
/// - Parameters must be simple identifiers
/// - The return type must implement `flowx::TaskResult` (any `Result<T, E>`)
#[proc_macro_attribute]
pub fn inject(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let task_fn = parse_macro_input!(item as ItemFn);

    if !task_fn.sig.generics.params.is_empty() {
        return syn::Error::new_spanned(
            &task_fn.sig.generics,
            "#[inject] functions cannot be generic\n\n\
             Dependency outputs are looked up by concrete type at run time.",
        )
        .to_compile_error()
        .into();
    }

    let output_type = match &task_fn.sig.output {
        ReturnType::Type(_, ty) => ty.clone(),
        ReturnType::Default => {
            return syn::Error::new_spanned(
                &task_fn.sig,
                "#[inject] functions must return a Result\n\n\
                 Expected signature: async fn name(dep: &T, ...) -> Result<Output, Error>",
            )
            .to_compile_error()
            .into();
        }
    };

    // (parameter name, dependency type, passed by reference)
    let params_result: Result<Vec<_>, _> = task_fn
        .sig
        .inputs
        .iter()
        .map(|arg| {
            let FnArg::Typed(PatType { pat, ty, .. }) = arg else {
                return Err(syn::Error::new_spanned(
                    arg,
                    "#[inject] applies to free functions only\n\n\
                     Remove the `self` parameter.",
                ));
            };

            let Pat::Ident(pat_ident) = &**pat else {
                return Err(syn::Error::new_spanned(
                    pat,
                    "Unsupported parameter pattern\n\n\
                     Parameters must be simple identifiers naming a task, like 'rows: &Vec<Row>'.",
                ));
            };

            Ok(match &**ty {
                Type::Reference(type_ref) => {
                    (pat_ident.ident.clone(), (*type_ref.elem).clone(), true)
                }
                other => (pat_ident.ident.clone(), other.clone(), false),
            })
        })
        .collect();

    let params = match params_result {
        Ok(p) => p,
        Err(e) => return e.to_compile_error().into(),
    };

    let attrs = &task_fn.attrs;
    let vis = &task_fn.vis;
    let name = &task_fn.sig.ident;

    let mut inner_fn = task_fn.clone();
    inner_fn.attrs.clear();
    inner_fn.vis = Visibility::Inherited;

    let call = {
        let args = params.iter().map(|(ident, _, by_ref)| {
            if *by_ref {
                quote! { #ident }
            } else {
                quote! { ::core::clone::Clone::clone(#ident) }
            }
        });
        let call = quote! { #name(#(#args),*) };
        if task_fn.sig.asyncness.is_some() {
            quote! { #call.await }
        } else {
            call
        }
    };

    let body = if params.is_empty() {
        quote! {
            ::flowx::AutoTask::leaf(|| async move {
                ::flowx::TaskResult::into_result(#call)
            })
        }
    } else {
        let deps = Ident::new("__flowx_deps", Span::mixed_site());
        let names: Vec<_> = params
            .iter()
            .map(|(ident, _, _)| LitStr::new(&ident.to_string(), ident.span()))
            .collect();
        let lookups = params.iter().zip(&names).map(|((ident, ty, _), lit)| {
            quote! {
                let #ident = ::flowx::injected::<#ty>(&#deps, #lit);
            }
        });
        quote! {
            ::flowx::AutoTask::with_deps([#(#names),*], |#deps: ::flowx::Results| async move {
                #(#lookups)*
                ::flowx::TaskResult::into_result(#call)
            })
        }
    };

    quote! {
        #(#attrs)*
        #vis fn #name() -> ::flowx::AutoTask<<#output_type as ::flowx::TaskResult>::Error> {
            #inner_fn

            #body
        }
    }
    .into()
}
