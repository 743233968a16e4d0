//! The runtime's C API surface, declared once.
//!
//! Every required symbol appears exactly one time in the `runtime_symbols!`
//! invocation below. That single list drives the `RuntimeApi` field
//! declarations, the `REQUIRED_SYMBOLS` name list and the resolution loop,
//! so they cannot drift apart.

#![allow(non_snake_case, non_camel_case_types)]

use std::collections::BTreeMap;
use std::ffi::c_void;
use std::os::raw::{c_char, c_int};
use std::path::Path;
use std::ptr::NonNull;

use super::error::BindError;
use super::loader::SymbolSource;

/// Opaque runtime object.
#[repr(C)]
pub struct PyObject {
    _private: [u8; 0],
}

/// Opaque runtime type object.
#[repr(C)]
pub struct PyTypeObject {
    _private: [u8; 0],
}

/// Opaque boolean singleton layout.
#[repr(C)]
pub struct PyIntObject {
    _private: [u8; 0],
}

/// Opaque method table entry.
#[repr(C)]
pub struct PyMethodDef {
    _private: [u8; 0],
}

pub type Py_ssize_t = isize;
pub type PyGILState_STATE = c_int;

// The 2.x headers rename this entry point on 64-bit builds.
#[cfg(target_pointer_width = "64")]
const INIT_MODULE4: &str = "Py_InitModule4_64";
#[cfg(not(target_pointer_width = "64"))]
const INIT_MODULE4: &str = "Py_InitModule4";

macro_rules! symbol_name {
    ($field:ident) => {
        stringify!($field)
    };
    ($field:ident, $exported:ident) => {
        $exported
    };
}

macro_rules! runtime_symbols {
    (
        functions {
            $( $fn_field:ident $(as $fn_exported:ident)? : $fn_ty:ty; )*
        }
        data {
            $( $data_field:ident : $data_ty:ty; )*
        }
    ) => {
        /// Typed entry points and global data of the bound runtime.
        ///
        /// Function fields are called directly; data fields point at the
        /// runtime's own globals.
        pub struct RuntimeApi {
            $( pub $fn_field: $fn_ty, )*
            $( pub $data_field: *mut $data_ty, )*
        }

        /// Every symbol the binder must resolve, in resolution order.
        pub const REQUIRED_SYMBOLS: &[&str] = &[
            $( symbol_name!($fn_field $(, $fn_exported)?), )*
            $( stringify!($data_field), )*
        ];

        impl RuntimeApi {
            /// Resolves every required symbol or fails on the first absent one.
            pub(crate) fn resolve<S>(
                module: &S,
                library: &Path,
            ) -> Result<(SymbolTable, RuntimeApi), BindError>
            where
                S: SymbolSource + ?Sized,
            {
                let mut entries = BTreeMap::new();
                let mut lookup = |symbol: &'static str| -> Result<NonNull<c_void>, BindError> {
                    let address = module.lookup(symbol).ok_or_else(|| BindError::SymbolMissing {
                        symbol,
                        library: library.to_path_buf(),
                    })?;
                    entries.insert(symbol, address);
                    Ok(address)
                };

                let api = RuntimeApi {
                    $(
                        // SAFETY: the field type is the C signature of the
                        // exported function of the same name.
                        $fn_field: unsafe {
                            std::mem::transmute::<*mut c_void, $fn_ty>(
                                lookup(symbol_name!($fn_field $(, $fn_exported)?))?.as_ptr(),
                            )
                        },
                    )*
                    $(
                        $data_field: lookup(stringify!($data_field))?.as_ptr().cast::<$data_ty>(),
                    )*
                };

                Ok((SymbolTable { entries }, api))
            }
        }
    };
}

runtime_symbols! {
    functions {
        PyArg_ParseTuple: unsafe extern "C" fn(*mut PyObject, *const c_char, ...) -> c_int;
        PyErr_Occurred: unsafe extern "C" fn() -> *mut PyObject;
        PyErr_Print: unsafe extern "C" fn();
        PyErr_SetString: unsafe extern "C" fn(*mut PyObject, *const c_char);
        PyGILState_Ensure: unsafe extern "C" fn() -> PyGILState_STATE;
        PyGILState_Release: unsafe extern "C" fn(PyGILState_STATE);
        PyImport_ImportModule: unsafe extern "C" fn(*const c_char) -> *mut PyObject;
        PyList_New: unsafe extern "C" fn(Py_ssize_t) -> *mut PyObject;
        PyList_SetItem: unsafe extern "C" fn(*mut PyObject, Py_ssize_t, *mut PyObject) -> c_int;
        PyModule_AddObject: unsafe extern "C" fn(*mut PyObject, *const c_char, *mut PyObject) -> c_int;
        PyObject_CallFunction: unsafe extern "C" fn(*mut PyObject, *const c_char, ...) -> *mut PyObject;
        PyObject_CallMethod: unsafe extern "C" fn(*mut PyObject, *const c_char, *const c_char, ...) -> *mut PyObject;
        PyObject_GetAttrString: unsafe extern "C" fn(*mut PyObject, *const c_char) -> *mut PyObject;
        PyObject_SetAttrString: unsafe extern "C" fn(*mut PyObject, *const c_char, *mut PyObject) -> c_int;
        PySequence_SetSlice: unsafe extern "C" fn(*mut PyObject, Py_ssize_t, Py_ssize_t, *mut PyObject) -> c_int;
        PyString_FromString: unsafe extern "C" fn(*const c_char) -> *mut PyObject;
        PySys_SetArgv: unsafe extern "C" fn(c_int, *mut *mut c_char);
        PyType_GenericNew: unsafe extern "C" fn(*mut PyTypeObject, *mut PyObject, *mut PyObject) -> *mut PyObject;
        PyType_IsSubtype: unsafe extern "C" fn(*mut PyTypeObject, *mut PyTypeObject) -> c_int;
        PyType_Ready: unsafe extern "C" fn(*mut PyTypeObject) -> c_int;
        Py_BuildValue: unsafe extern "C" fn(*const c_char, ...) -> *mut PyObject;
        Py_InitModule4 as INIT_MODULE4: unsafe extern "C" fn(*const c_char, *mut PyMethodDef, *const c_char, *mut PyObject, c_int) -> *mut PyObject;
        Py_Initialize: unsafe extern "C" fn();
        Py_Finalize: unsafe extern "C" fn();
        Py_Main: unsafe extern "C" fn(c_int, *mut *mut c_char) -> c_int;
    }
    data {
        _Py_NoneStruct: PyObject;
        _Py_TrueStruct: PyIntObject;
        _Py_ZeroStruct: PyIntObject;
        PyExc_RuntimeError: *mut PyObject;
        PyExc_TypeError: *mut PyObject;
    }
}

// SAFETY: the struct only holds addresses inside the loaded module and is
// never mutated after `resolve` returns.
unsafe impl Send for RuntimeApi {}
unsafe impl Sync for RuntimeApi {}

impl std::fmt::Debug for RuntimeApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeApi")
            .field("symbols", &REQUIRED_SYMBOLS.len())
            .finish_non_exhaustive()
    }
}

/// Resolved address of every required symbol, keyed by exported name.
///
/// Only `RuntimeApi::resolve` builds one, so a table always holds exactly
/// `REQUIRED_SYMBOLS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolTable {
    entries: BTreeMap<&'static str, NonNull<c_void>>,
}

// SAFETY: addresses only; see `RuntimeApi`.
unsafe impl Send for SymbolTable {}
unsafe impl Sync for SymbolTable {}

impl SymbolTable {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn address(&self, name: &str) -> Option<NonNull<c_void>> {
        self.entries.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::path::PathBuf;

    static SENTINEL: [u8; 64] = [0; 64];

    struct MapModule(HashMap<&'static str, NonNull<c_void>>);

    impl SymbolSource for MapModule {
        fn lookup(&self, name: &str) -> Option<NonNull<c_void>> {
            self.0.get(name).copied()
        }
    }

    fn module_without(missing: &[&str]) -> MapModule {
        MapModule(
            REQUIRED_SYMBOLS
                .iter()
                .enumerate()
                .filter(|(_, name)| !missing.contains(name))
                .map(|(i, name)| (*name, NonNull::from(&SENTINEL[i]).cast::<c_void>()))
                .collect(),
        )
    }

    #[test]
    fn required_symbols_have_no_duplicates() {
        let unique: HashSet<_> = REQUIRED_SYMBOLS.iter().collect();
        assert_eq!(unique.len(), REQUIRED_SYMBOLS.len());
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn required_symbol_list_is_stable() {
        insta::assert_debug_snapshot!(REQUIRED_SYMBOLS, @r###"
        [
            "PyArg_ParseTuple",
            "PyErr_Occurred",
            "PyErr_Print",
            "PyErr_SetString",
            "PyGILState_Ensure",
            "PyGILState_Release",
            "PyImport_ImportModule",
            "PyList_New",
            "PyList_SetItem",
            "PyModule_AddObject",
            "PyObject_CallFunction",
            "PyObject_CallMethod",
            "PyObject_GetAttrString",
            "PyObject_SetAttrString",
            "PySequence_SetSlice",
            "PyString_FromString",
            "PySys_SetArgv",
            "PyType_GenericNew",
            "PyType_IsSubtype",
            "PyType_Ready",
            "Py_BuildValue",
            "Py_InitModule4_64",
            "Py_Initialize",
            "Py_Finalize",
            "Py_Main",
            "_Py_NoneStruct",
            "_Py_TrueStruct",
            "_Py_ZeroStruct",
            "PyExc_RuntimeError",
            "PyExc_TypeError",
        ]
        "###);
    }

    #[test]
    fn resolve_fills_every_entry() {
        let module = module_without(&[]);
        let (table, api) = RuntimeApi::resolve(&module, Path::new("/rt/Python")).unwrap();

        assert_eq!(table.len(), REQUIRED_SYMBOLS.len());
        for name in REQUIRED_SYMBOLS {
            assert_eq!(table.address(name), module.lookup(name), "{name}");
        }
        assert_eq!(
            api._Py_NoneStruct.cast::<c_void>(),
            module.lookup("_Py_NoneStruct").unwrap().as_ptr()
        );
        assert_eq!(
            api.Py_Main as *const c_void,
            module.lookup("Py_Main").unwrap().as_ptr() as *const c_void
        );
    }

    #[test]
    fn resolve_reports_the_missing_data_symbol() {
        let module = module_without(&["PyExc_TypeError"]);
        let err = RuntimeApi::resolve(&module, Path::new("/rt/Python")).unwrap_err();

        assert_eq!(
            err,
            BindError::SymbolMissing {
                symbol: "PyExc_TypeError",
                library: PathBuf::from("/rt/Python"),
            }
        );
    }

    #[test]
    fn resolve_reports_the_exported_name_for_renamed_entries() {
        let module = module_without(&[INIT_MODULE4]);
        let err = RuntimeApi::resolve(&module, Path::new("/rt/Python")).unwrap_err();
        assert_eq!(err.missing_symbol(), Some(INIT_MODULE4));
    }
}
