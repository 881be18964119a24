/// Build script for RTEngine
///
/// 光线追踪着色器库在运行时由 DXC 编译（lib_6_3），
/// 这里只在 HLSL 源改动时触发重新构建。
fn main() {
    println!("cargo:rerun-if-changed=shaders/raytracing.hlsl");
    println!("cargo:rerun-if-changed=config.toml");
}
