use log::debug;

use crate::Settings;

macro_rules! passes {
    ([ $( $name:ident => $class:ident, )* ]) => {
        $( mod $name; )*
        $( pub use self::$name::*; )*

        /// Recorders of the commands that make up a single frame.
        #[derive(Debug)]
        pub struct FramePasses {
            $( pub $name: $class, )*
        }

        impl FramePasses {
            pub fn new(settings: &Settings) -> Self {
                debug!("Initializing frame passes");

                Self {
                    $( $name: $class::new(settings), )*
                }
            }
        }
    };
}

passes!([
    tracing => TracingPass,
    denoising => DenoisingPass,
    reprojection => ReprojectionPass,
    presenting => PresentingPass,
]);
