use std::sync::Arc;

use pretty_assertions::assert_eq;
use prism_translator::ast::{build, Node};
use prism_translator::symbol::{IdAllocator, Variable};
use prism_translator::symbol_table::BuiltInRegistry;
use prism_translator::types::{BasicType, Field, Precision, Qualifier, Type};
use prism_translator::{
    BuiltInResources, CompileOptions, OutputType, ShaderSpec, ShaderStage, TranslateOptions,
    TranslateOutput, Translator,
};

struct Fixture {
    translator: Translator,
    ids: IdAllocator,
}

impl Fixture {
    fn new(output: OutputType, flags: CompileOptions) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let mut translator = Translator::new(
            ShaderStage::Fragment,
            ShaderSpec::Gles2,
            output,
            BuiltInResources::default(),
        );
        translator.set_options(TranslateOptions {
            flags,
            ..TranslateOptions::default()
        });
        // Far above anything the registry hands out.
        let ids = IdAllocator::starting_at(1 << 20);
        Self { translator, ids }
    }

    fn builtin_variable(&self, name: &str) -> Arc<Variable> {
        let registry: &BuiltInRegistry = self.translator.builtins();
        registry
            .find_builtin(name, 100)
            .and_then(|s| s.as_variable())
            .cloned()
            .unwrap_or_else(|| panic!("{name} is not a built-in variable"))
    }

    fn var(&mut self, name: &str, basic: BasicType, precision: Precision, qualifier: Qualifier, size: u8) -> Arc<Variable> {
        self.ids
            .new_variable(name, Type::new(basic, precision, qualifier, size))
    }

    fn translate(&mut self, mut globals: Vec<Node>, body: Vec<Node>) -> TranslateOutput {
        let main = self.ids.new_function("main", Type::void(), vec![]);
        globals.push(build::function(&main, body));
        let mut root = build::block(globals);
        self.translator.translate(&mut root).expect("translate")
    }
}

fn textured_fragment(output: OutputType) -> String {
    let mut f = Fixture::new(output, CompileOptions::empty());
    let tex = f.var("tex", BasicType::Sampler2D, Precision::Low, Qualifier::Uniform, 1);
    let uv = f.var("uv", BasicType::Float, Precision::Medium, Qualifier::VaryingIn, 2);
    let frag_color = f.builtin_variable("gl_FragColor");
    let texture2d = f
        .translator
        .builtins()
        .find_builtin("texture2D", 100)
        .and_then(|s| s.as_function())
        .cloned()
        .expect("texture2D");

    f.translate(
        vec![build::declare(&tex), build::declare(&uv)],
        vec![build::assign(
            build::symbol(&frag_color),
            build::builtin_call(&texture2d, vec![build::symbol(&tex), build::symbol(&uv)]),
        )],
    )
    .object_code
}

#[test]
fn essl_fragment_shader() {
    insta::assert_snapshot!(textured_fragment(OutputType::Essl), @r"
    uniform lowp sampler2D tex;
    varying mediump vec2 uv;
    void main(){
    (gl_FragColor = texture2D(tex, uv));
    }
    ");
}

#[test]
fn glsl_130_fragment_shader() {
    insta::assert_snapshot!(textured_fragment(OutputType::Glsl { version: 130 }), @r"
    #version 130
    uniform sampler2D tex;
    in vec2 uv;
    void main(){
    (gl_FragColor = texture(tex, uv));
    }
    ");
}

#[test]
fn hashed_names_are_stable_within_a_compile() {
    let mut f = Fixture::new(OutputType::Essl, CompileOptions::HASH_NAMES);
    let scale = f.var("scale", BasicType::Float, Precision::Medium, Qualifier::Uniform, 1);
    let frag_color = f.builtin_variable("gl_FragColor");
    let product = build::mul(
        build::mul(build::symbol(&scale), build::symbol(&scale)),
        build::symbol(&scale),
    );
    let out = f.translate(
        vec![build::declare(&scale)],
        vec![build::assign(
            build::symbol(&frag_color),
            build::construct(Type::temp(BasicType::Float, Precision::Medium, 4), vec![product]),
        )],
    );

    let hashed = out.name_map.get("scale").expect("scale hashed").to_owned();
    assert!(hashed.starts_with("webgl_"));
    assert_eq!(out.object_code.matches(hashed.as_str()).count(), 4);
    assert!(!out.object_code.contains("scale"));
    assert!(out.object_code.contains("gl_FragColor"));
    assert!(out.object_code.contains("void main(){"));
    assert_eq!(out.name_map.get("gl_FragColor"), None);
    assert_eq!(out.name_map.get("main"), None);
}

#[test]
fn precision_wrapper_surrounds_each_read_once() {
    let glsl = OutputType::Glsl { version: 110 };
    let build_shader = |f: &mut Fixture| {
        let m = f.var("m", BasicType::Float, Precision::Medium, Qualifier::Uniform, 1);
        let h = f.var("h", BasicType::Float, Precision::High, Qualifier::Global, 1);
        let n = f.var("n", BasicType::Float, Precision::Medium, Qualifier::Global, 1);
        f.translate(
            vec![build::declare(&m), build::declare(&h), build::declare(&n)],
            vec![
                build::assign(build::symbol(&h), build::symbol(&m)),
                build::assign(build::symbol(&n), build::symbol(&m)),
            ],
        )
        .object_code
    };

    let mut emulated = Fixture::new(glsl, CompileOptions::EMULATE_PRECISION);
    let code = build_shader(&mut emulated);
    let body = &code[code.find("float m;").expect("declaration")..];
    assert_eq!(body.matches("webgl_frm(m)").count(), 2);
    assert!(body.contains("(h = webgl_frm(m));\n"));
    assert!(body.contains("(n = webgl_frm(m));\n"));
    assert!(!body.contains("webgl_frm(webgl_frm("));
    assert!(!body.contains("webgl_frm(n)"));

    let mut plain = Fixture::new(glsl, CompileOptions::empty());
    let code = build_shader(&mut plain);
    assert!(!code.contains("webgl_fr"));
}

#[test]
fn struct_field_reads_are_rounded() {
    let mut f = Fixture::new(OutputType::Glsl { version: 110 }, CompileOptions::EMULATE_PRECISION);
    let light = f.ids.new_struct(
        "Light",
        vec![Field {
            name: "intensity".to_owned(),
            ty: Type::temp(BasicType::Float, Precision::Medium, 1),
        }],
    );
    let m = f.var("m", BasicType::Float, Precision::Medium, Qualifier::Uniform, 1);
    let h = f.var("h", BasicType::Float, Precision::High, Qualifier::Global, 1);
    let s = f
        .ids
        .new_variable("s", Type::structure(Arc::clone(&light), Qualifier::Global));
    let code = f
        .translate(
            vec![build::declare(&m), build::declare(&h), build::declare(&s)],
            vec![
                build::assign(build::field(build::symbol(&s), 0), build::symbol(&m)),
                build::assign(build::symbol(&h), build::field(build::symbol(&s), 0)),
            ],
        )
        .object_code;

    assert!(code.contains("(s.intensity = webgl_frm(m));\n"), "{code}");
    assert!(code.contains("(h = webgl_frm(s.intensity));\n"), "{code}");
    assert!(!code.contains("webgl_frm(s)"));
}

#[test]
fn named_struct_body_is_written_once() {
    let mut f = Fixture::new(OutputType::Essl, CompileOptions::HASH_NAMES);
    let light = f.ids.new_struct(
        "Light",
        vec![Field {
            name: "intensity".to_owned(),
            ty: Type::temp(BasicType::Float, Precision::Medium, 1),
        }],
    );
    let uniforms: Vec<Arc<Variable>> = ["a", "b", "c"]
        .into_iter()
        .map(|name| {
            f.ids
                .new_variable(name, Type::structure(Arc::clone(&light), Qualifier::Uniform))
        })
        .collect();
    let out = f.translate(uniforms.iter().map(build::declare).collect(), vec![]);

    let light_name = out.name_map.get("Light").expect("struct name hashed");
    let b = out.name_map.get("b").expect("b hashed");
    let c = out.name_map.get("c").expect("c hashed");
    assert_eq!(out.object_code.matches("struct ").count(), 1);
    assert_eq!(out.object_code.matches(light_name).count(), 3);
    assert!(out.object_code.contains(&format!("uniform {light_name} {b};\n")));
    assert!(out.object_code.contains(&format!("uniform {light_name} {c};\n")));
}
