// src/macros.rs

/// Declares a command model: the struct itself plus its
/// [`CliModel`](crate::models::CliModel) implementation, generated at compile
/// time so the field list, the descriptor and the value conversions can never
/// drift apart.
///
/// Field grammar, one declaration per line, each terminated by `;`:
///
/// - `name: kind;` declares a required field.
/// - `name: kind = default;` declares an optional field with a default.
/// - `name: kind?;` declares an optional field without one (`Option<T>`).
///
/// `kind` is one of `string`, `integer`, `float`, `boolean`. Any form may
/// carry a trailing `, "help text"` before the `;`. After the struct, an
/// optional `validate = path;` clause wires a `fn(&Self) -> Result<(), String>`
/// into the model's validation hook.
///
/// ```
/// use argform::cli_model;
/// use argform::models::CliModel;
///
/// cli_model! {
///     pub struct Export {
///         path: string, "Filesystem destination";
///         format: string = "csv", "Output format";
///         limit: integer?, "Optional row cap";
///         overwrite: boolean = false;
///     }
/// }
///
/// let descriptor = Export::descriptor();
/// assert_eq!(descriptor.model(), "Export");
/// assert_eq!(descriptor.fields().len(), 4);
///
/// let export = Export {
///     path: "out/data".to_string(),
///     format: "csv".to_string(),
///     limit: None,
///     overwrite: false,
/// };
/// assert_eq!(Export::from_values(&export.to_values()).unwrap(), export);
/// ```
#[macro_export]
macro_rules! cli_model {
    // --- Entry point ---
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($body:tt)*
        }
        $( validate = $validator:path ; )?
    ) => {
        $crate::cli_model!(@munch
            meta [ $(#[$meta])* ]
            vis [ $vis ]
            name [ $name ]
            validator [ $( $validator )? ]
            fields [ ]
            rest [ $($body)* ]
        );
    };

    // --- Field muncher ---
    // One arm per line shape, most specific first. Each normalizes the line
    // into a `{ name kind { mode } { help } }` bundle and recurses.
    (@munch
        meta [ $($meta:tt)* ] vis [ $($vis:tt)* ] name [ $name:ident ]
        validator [ $($validator:tt)* ] fields [ $($fields:tt)* ]
        rest [ $f:ident : $k:ident ? , $h:literal ; $($rest:tt)* ]
    ) => {
        $crate::cli_model!(@munch
            meta [ $($meta)* ] vis [ $($vis)* ] name [ $name ]
            validator [ $($validator)* ]
            fields [ $($fields)* { $f $k { opt } { $h } } ]
            rest [ $($rest)* ]
        );
    };
    (@munch
        meta [ $($meta:tt)* ] vis [ $($vis:tt)* ] name [ $name:ident ]
        validator [ $($validator:tt)* ] fields [ $($fields:tt)* ]
        rest [ $f:ident : $k:ident ? ; $($rest:tt)* ]
    ) => {
        $crate::cli_model!(@munch
            meta [ $($meta)* ] vis [ $($vis)* ] name [ $name ]
            validator [ $($validator)* ]
            fields [ $($fields)* { $f $k { opt } { } } ]
            rest [ $($rest)* ]
        );
    };
    (@munch
        meta [ $($meta:tt)* ] vis [ $($vis:tt)* ] name [ $name:ident ]
        validator [ $($validator:tt)* ] fields [ $($fields:tt)* ]
        rest [ $f:ident : $k:ident = $d:expr , $h:literal ; $($rest:tt)* ]
    ) => {
        $crate::cli_model!(@munch
            meta [ $($meta)* ] vis [ $($vis)* ] name [ $name ]
            validator [ $($validator)* ]
            fields [ $($fields)* { $f $k { def ($d) } { $h } } ]
            rest [ $($rest)* ]
        );
    };
    (@munch
        meta [ $($meta:tt)* ] vis [ $($vis:tt)* ] name [ $name:ident ]
        validator [ $($validator:tt)* ] fields [ $($fields:tt)* ]
        rest [ $f:ident : $k:ident = $d:expr ; $($rest:tt)* ]
    ) => {
        $crate::cli_model!(@munch
            meta [ $($meta)* ] vis [ $($vis)* ] name [ $name ]
            validator [ $($validator)* ]
            fields [ $($fields)* { $f $k { def ($d) } { } } ]
            rest [ $($rest)* ]
        );
    };
    (@munch
        meta [ $($meta:tt)* ] vis [ $($vis:tt)* ] name [ $name:ident ]
        validator [ $($validator:tt)* ] fields [ $($fields:tt)* ]
        rest [ $f:ident : $k:ident , $h:literal ; $($rest:tt)* ]
    ) => {
        $crate::cli_model!(@munch
            meta [ $($meta)* ] vis [ $($vis)* ] name [ $name ]
            validator [ $($validator)* ]
            fields [ $($fields)* { $f $k { req } { $h } } ]
            rest [ $($rest)* ]
        );
    };
    (@munch
        meta [ $($meta:tt)* ] vis [ $($vis:tt)* ] name [ $name:ident ]
        validator [ $($validator:tt)* ] fields [ $($fields:tt)* ]
        rest [ $f:ident : $k:ident ; $($rest:tt)* ]
    ) => {
        $crate::cli_model!(@munch
            meta [ $($meta)* ] vis [ $($vis)* ] name [ $name ]
            validator [ $($validator)* ]
            fields [ $($fields)* { $f $k { req } { } } ]
            rest [ $($rest)* ]
        );
    };
    // All lines consumed: generate the items.
    (@munch
        meta [ $($meta:tt)* ] vis [ $($vis:tt)* ] name [ $name:ident ]
        validator [ $($validator:tt)* ] fields [ $($fields:tt)* ]
        rest [ ]
    ) => {
        $crate::cli_model!(@emit
            meta [ $($meta)* ] vis [ $($vis)* ] name [ $name ]
            validator [ $($validator)* ] fields [ $($fields)* ]
        );
    };

    // --- Item generation ---
    (@emit
        meta [ $($meta:tt)* ] vis [ $($vis:tt)* ] name [ $name:ident ]
        validator [ $($validator:tt)* ]
        fields [ $( { $f:ident $k:ident { $($mode:tt)* } { $($help:tt)* } } )* ]
    ) => {
        $($meta)*
        #[derive(Debug, Clone, PartialEq)]
        $($vis)* struct $name {
            $( pub $f: $crate::cli_model!(@ty $k { $($mode)* }), )*
        }

        impl $crate::models::CliModel for $name {
            fn descriptor() -> &'static $crate::models::ModelDescriptor {
                static DESCRIPTOR: ::std::sync::OnceLock<$crate::models::ModelDescriptor> =
                    ::std::sync::OnceLock::new();
                DESCRIPTOR.get_or_init(|| {
                    $crate::models::ModelDescriptor::new(
                        stringify!($name),
                        ::std::vec![
                            $( $crate::cli_model!(@def $f $k { $($mode)* } { $($help)* }), )*
                        ],
                    )
                })
            }

            fn from_values(
                values: &$crate::models::ValueMap,
            ) -> ::core::result::Result<Self, $crate::models::FieldFault> {
                Ok(Self {
                    $( $f: $crate::cli_model!(@read values $f $k { $($mode)* }), )*
                })
            }

            fn to_values(&self) -> $crate::models::ValueMap {
                let mut map = $crate::models::ValueMap::new();
                $( $crate::cli_model!(@write map self $f $k { $($mode)* }); )*
                map
            }

            $crate::cli_model!(@validate_fn $($validator)*);
        }
    };

    // --- Rust type of one field ---
    (@ty $k:ident { opt }) => { ::core::option::Option<$crate::cli_model!(@base_ty $k)> };
    (@ty $k:ident { $($mode:tt)* }) => { $crate::cli_model!(@base_ty $k) };

    (@base_ty string) => { ::std::string::String };
    (@base_ty integer) => { i64 };
    (@base_ty float) => { f64 };
    (@base_ty boolean) => { bool };

    // --- Declared FieldType of one kind ---
    (@field_type string) => { $crate::models::FieldType::String };
    (@field_type integer) => { $crate::models::FieldType::Integer };
    (@field_type float) => { $crate::models::FieldType::Float };
    (@field_type boolean) => { $crate::models::FieldType::Boolean };

    // --- Properly typed default literal ---
    (@lit string $d:tt) => { ::std::string::String::from($d) };
    (@lit integer $d:tt) => { ($d as i64) };
    (@lit float $d:tt) => { ($d as f64) };
    (@lit boolean $d:tt) => { $d };

    // --- FieldDef for the descriptor ---
    (@def $f:ident $k:ident { req } { $($help:tt)* }) => {
        $crate::cli_model!(@with_help
            $crate::models::FieldDef::new(stringify!($f), $crate::cli_model!(@field_type $k)),
            { $($help)* }
        )
    };
    (@def $f:ident $k:ident { def $d:tt } { $($help:tt)* }) => {
        $crate::cli_model!(@with_help
            $crate::models::FieldDef::new(stringify!($f), $crate::cli_model!(@field_type $k))
                .with_default($crate::cli_model!(@lit $k $d)),
            { $($help)* }
        )
    };
    (@def $f:ident $k:ident { opt } { $($help:tt)* }) => {
        $crate::cli_model!(@with_help
            $crate::models::FieldDef::new(
                stringify!($f),
                $crate::models::FieldType::Optional(
                    ::std::boxed::Box::new($crate::cli_model!(@field_type $k)),
                ),
            ),
            { $($help)* }
        )
    };

    (@with_help $builder:expr, { }) => { $builder };
    (@with_help $builder:expr, { $h:literal }) => { $builder.with_help($h) };

    // --- Pull one field out of an argument bag ---
    (@read $vals:ident $f:ident $k:ident { req }) => {
        match $vals.get(stringify!($f)) {
            Some(value) => $crate::cli_model!(@get value $f $k)?,
            None => return Err($crate::models::FieldFault::missing(stringify!($f))),
        }
    };
    (@read $vals:ident $f:ident $k:ident { def $d:tt }) => {
        match $vals.get(stringify!($f)) {
            Some(value) => $crate::cli_model!(@get value $f $k)?,
            None => $crate::cli_model!(@lit $k $d),
        }
    };
    (@read $vals:ident $f:ident $k:ident { opt }) => {
        match $vals.get(stringify!($f)) {
            Some(value) => Some($crate::cli_model!(@get value $f $k)?),
            None => None,
        }
    };

    (@get $v:ident $f:ident string) => {
        $v.as_str().map(::std::string::String::from).ok_or_else(|| {
            $crate::models::FieldFault::mismatch(
                stringify!($f),
                $crate::models::ParamKind::String,
                $v,
            )
        })
    };
    (@get $v:ident $f:ident integer) => {
        $v.as_integer().ok_or_else(|| {
            $crate::models::FieldFault::mismatch(
                stringify!($f),
                $crate::models::ParamKind::Integer,
                $v,
            )
        })
    };
    (@get $v:ident $f:ident float) => {
        $v.as_float().ok_or_else(|| {
            $crate::models::FieldFault::mismatch(
                stringify!($f),
                $crate::models::ParamKind::Float,
                $v,
            )
        })
    };
    (@get $v:ident $f:ident boolean) => {
        $v.as_bool().ok_or_else(|| {
            $crate::models::FieldFault::mismatch(
                stringify!($f),
                $crate::models::ParamKind::Boolean,
                $v,
            )
        })
    };

    // --- Insert one field into an argument bag ---
    (@write $map:ident $obj:ident $f:ident $k:ident { opt }) => {
        if let Some(value) = &$obj.$f {
            $map.insert(
                stringify!($f).to_string(),
                $crate::models::FieldValue::from($crate::cli_model!(@owned_ref value $k)),
            );
        }
    };
    (@write $map:ident $obj:ident $f:ident $k:ident { $($mode:tt)* }) => {
        $map.insert(
            stringify!($f).to_string(),
            $crate::models::FieldValue::from($crate::cli_model!(@owned $obj $f $k)),
        );
    };

    (@owned $obj:ident $f:ident string) => { $obj.$f.clone() };
    (@owned $obj:ident $f:ident integer) => { $obj.$f };
    (@owned $obj:ident $f:ident float) => { $obj.$f };
    (@owned $obj:ident $f:ident boolean) => { $obj.$f };

    (@owned_ref $v:ident string) => { $v.clone() };
    (@owned_ref $v:ident integer) => { *$v };
    (@owned_ref $v:ident float) => { *$v };
    (@owned_ref $v:ident boolean) => { *$v };

    // --- Optional validation hook ---
    (@validate_fn) => {};
    (@validate_fn $($validator:tt)+) => {
        fn validate(&self) -> ::core::result::Result<(), ::std::string::String> {
            $($validator)+(self)
        }
    };
}

// MARK: --- UNIT TESTS ---
